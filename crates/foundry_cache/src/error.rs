//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while writing to a cache.
///
/// Reads are fail-safe: a missing, corrupt or incompatible entry is a cache
/// miss, never an error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An artifact could not be encoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}
