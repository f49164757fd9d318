mod binary_collection;
mod invert;
mod memory;
mod payload_vector;

pub use binary_collection::*;
pub use invert::*;
pub use memory::MemorySource;
pub use payload_vector::*;
