pub const PROGRAM_NAME: &str = "sift";
pub const PROGRAM_LOG_LEVEL: &str = "SIFT_LOG_LEVEL";

/// Run tag used in TREC output lines when the caller does not supply one.
pub const DEFAULT_RUN_ID: &str = "sift";
