//! Redis error conversion.

use sp_cache::CacheError;

/// Maps a `fred` error onto a [`CacheError`].
#[allow(clippy::needless_pass_by_value)]
pub fn from_redis_error(err: fred::error::Error) -> CacheError {
    match err.kind() {
        fred::error::ErrorKind::IO | fred::error::ErrorKind::Canceled => {
            CacheError::Unavailable(err.to_string())
        }
        fred::error::ErrorKind::Timeout => CacheError::Timeout,
        fred::error::ErrorKind::Config | fred::error::ErrorKind::Url => {
            CacheError::Configuration(err.to_string())
        }
        _ => CacheError::Backend(err.to_string()),
    }
}

/// A stored value under `key` that is not an RFC 3339 instant.
pub fn corrupt_entry(key: &str, err: &chrono::ParseError) -> CacheError {
    CacheError::CorruptEntry {
        key: key.to_string(),
        reason: err.to_string(),
    }
}
