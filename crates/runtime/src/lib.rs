mod config;
pub mod logging;

pub use config::{DEFAULT_RUN_ID, PROGRAM_LOG_LEVEL, PROGRAM_NAME};

pub use logging::init;
