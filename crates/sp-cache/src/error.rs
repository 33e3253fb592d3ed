//! Cache error types.

use std::fmt;

/// Replay cache errors.
#[derive(Debug)]
pub enum CacheError {
    /// The backend could not be reached.
    Unavailable(String),
    /// The backend did not answer in time.
    Timeout,
    /// Invalid cache configuration.
    Configuration(String),
    /// A stored entry is not an issue instant.
    CorruptEntry {
        /// Request ID whose entry is unreadable.
        key: String,
        /// Why it could not be read.
        reason: String,
    },
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "replay cache unavailable: {msg}"),
            Self::Timeout => f.write_str("replay cache timed out"),
            Self::Configuration(msg) => write!(f, "invalid replay cache configuration: {msg}"),
            Self::CorruptEntry { key, reason } => {
                write!(f, "unreadable replay cache entry {key}: {reason}")
            }
            Self::Backend(msg) => write!(f, "replay cache backend error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
