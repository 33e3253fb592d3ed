//! Replay cache trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CacheResult;

/// Key to issue-instant store with time-to-live expiry.
///
/// Implementations must be thread-safe and make `save`, `get` and `remove`
/// atomic with respect to each other. In particular `remove` must hand the
/// entry to exactly one caller when several race for the same key.
///
/// Entries older than the backend's TTL are treated as absent by every
/// operation, whether or not they have been physically evicted yet.
#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Stores `key` unless it is already present.
    ///
    /// Returns `true` if the entry was created, `false` if a live entry
    /// already existed (the existing value is left untouched).
    async fn save(&self, key: &str, issued_at: DateTime<Utc>) -> CacheResult<bool>;

    /// Returns the issue instant recorded for `key`, if live.
    async fn get(&self, key: &str) -> CacheResult<Option<DateTime<Utc>>>;

    /// Removes `key` and returns its issue instant if a live entry existed.
    async fn remove(&self, key: &str) -> CacheResult<Option<DateTime<Utc>>>;
}
