//! In-memory replay cache.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::CacheResult;
use crate::provider::ReplayCache;

#[derive(Debug, Clone, Copy)]
struct Slot {
    issued_at: DateTime<Utc>,
    stored_at: Instant,
}

/// Process-local [`ReplayCache`] backed by a concurrent map.
///
/// Entries expire `ttl` after they were saved. Expired entries are ignored
/// on access and physically dropped by [`purge_expired`](Self::purge_expired),
/// which [`spawn_sweeper`](Self::spawn_sweeper) runs periodically.
#[derive(Debug)]
pub struct InMemoryReplayCache {
    entries: DashMap<String, Slot>,
    ttl: Duration,
}

impl InMemoryReplayCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_live(&self, slot: &Slot, now: Instant) -> bool {
        now.saturating_duration_since(slot.stored_at) < self.ttl
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| self.is_live(slot, now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "purged expired replay cache entries");
        }
        purged
    }

    /// Runs [`purge_expired`](Self::purge_expired) every `period` until the
    /// cache is dropped.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => break,
                }
            }
        })
    }
}

#[async_trait]
impl ReplayCache for InMemoryReplayCache {
    async fn save(&self, key: &str, issued_at: DateTime<Utc>) -> CacheResult<bool> {
        let now = Instant::now();
        let slot = Slot {
            issued_at,
            stored_at: now,
        };
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if self.is_live(occupied.get(), now) {
                    Ok(false)
                } else {
                    occupied.insert(slot);
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<DateTime<Utc>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|slot| self.is_live(slot, now))
            .map(|slot| slot.issued_at))
    }

    async fn remove(&self, key: &str) -> CacheResult<Option<DateTime<Utc>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, slot)| self.is_live(slot, now))
            .map(|(_, slot)| slot.issued_at))
    }
}
