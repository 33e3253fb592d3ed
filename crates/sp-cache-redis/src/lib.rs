//! # sp-cache-redis
//!
//! Redis replay cache for the SAML service provider, built on `fred`.
//!
//! Use it when several service provider instances sit behind a load
//! balancer: the IdP response may reach a different instance than the one
//! that issued the request.
//!
//! - `SET key value NX PX ttl` records a request ID only once
//! - `GETDEL` consumes it atomically
//! - every key is namespaced with the configured prefix
//!
//! ## Example
//!
//! ```ignore
//! use sp_cache_redis::{RedisConfig, RedisReplayCache};
//!
//! let config = RedisConfig::from_url("redis://redis.internal:6379/0");
//! let cache = RedisReplayCache::connect(config, Duration::from_secs(8 * 3600)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod provider;

pub use config::RedisConfig;
pub use provider::RedisReplayCache;
