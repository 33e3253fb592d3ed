//! Redis replay cache implementation.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use fred::prelude::*;
use sp_cache::{CacheError, CacheResult, ReplayCache};
use tracing::debug;

use crate::config::RedisConfig;
use crate::error::{corrupt_entry, from_redis_error};

/// Redis-backed [`ReplayCache`].
///
/// Each request ID is stored as `{prefix}:{id}` holding the RFC 3339 issue
/// instant, with a millisecond TTL so Redis does the eviction.
pub struct RedisReplayCache {
    client: Client,
    config: RedisConfig,
    ttl: Duration,
}

impl RedisReplayCache {
    /// Connects to Redis.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URL is invalid or the connection cannot be
    /// established within the configured connect timeout.
    pub async fn connect(config: RedisConfig, ttl: Duration) -> CacheResult<Self> {
        config.validate()?;
        let redis_config = Config::from_url(&config.connection_url())
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        let client = Client::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        tokio::time::timeout(config.connect_timeout(), client.init())
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(from_redis_error)?;

        debug!(host = %config.host, port = config.port, "replay cache connected to redis");
        Ok(Self {
            client,
            config,
            ttl,
        })
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn key(&self, key: &str) -> String {
        self.config.request_key(key)
    }

    async fn timed<T, F>(&self, command: F) -> CacheResult<T>
    where
        F: Future<Output = Result<T, fred::error::Error>> + Send,
    {
        tokio::time::timeout(self.config.command_timeout(), command)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(from_redis_error)
    }
}

/// TTL in whole milliseconds, at least one.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn ttl_millis(ttl: Duration) -> i64 {
    ttl.as_millis().clamp(1, i64::MAX as u128) as i64
}

fn decode(key: &str, value: Option<String>) -> CacheResult<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|instant| instant.with_timezone(&Utc))
                .map_err(|e| corrupt_entry(key, &e))
        })
        .transpose()
}

#[async_trait]
impl ReplayCache for RedisReplayCache {
    async fn save(&self, key: &str, issued_at: DateTime<Utc>) -> CacheResult<bool> {
        let key = self.key(key);
        let value = issued_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let created: Option<String> = self
            .timed(self.client.set(
                &key,
                value,
                Some(Expiration::PX(ttl_millis(self.ttl))),
                Some(SetOptions::NX),
                false,
            ))
            .await?;
        Ok(created.is_some())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<DateTime<Utc>>> {
        let key = self.key(key);
        let value: Option<String> = self.timed(self.client.get(&key)).await?;
        decode(&key, value)
    }

    async fn remove(&self, key: &str) -> CacheResult<Option<DateTime<Utc>>> {
        let key = self.key(key);
        let value: Option<String> = self.timed(self.client.getdel(&key)).await?;
        if value.is_some() {
            debug!(key = %key, "request ID removed from redis");
        }
        decode(&key, value)
    }
}
