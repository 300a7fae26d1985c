//! Domain types for the submission backend.
//!
//! Value types, configuration, errors, and the pure functions that derive
//! sign payloads and storage paths from a submission.

pub mod config;
pub mod error;
pub mod paths;
pub mod payload;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, IngestConfig};
pub use error::{StorageError, SubmitError, WhitelistError};
pub use paths::{is_block_path, StoragePaths, BLOCKS_PREFIX, SUBMISSIONS_PREFIX};
pub use types::*;
