//! # sp-cache
//!
//! Replay cache abstraction for the SAML service provider.
//!
//! The service provider records every request ID it sends while replay
//! protection is on, and consumes it exactly once when the matching response
//! arrives. This crate defines the storage interface for that bookkeeping.
//!
//! - [`ReplayCache`] - the async capability trait
//! - [`InMemoryReplayCache`] - process-local backend with TTL eviction
//!
//! A Redis backend lives in `sp-cache-redis`.
//!
//! ## Example
//!
//! ```ignore
//! use sp_cache::{InMemoryReplayCache, ReplayCache};
//!
//! let cache = InMemoryReplayCache::new(Duration::from_secs(8 * 3600));
//! cache.save("_a1b2", Utc::now()).await?;
//! assert!(cache.remove("_a1b2").await?.is_some());
//! assert!(cache.remove("_a1b2").await?.is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod provider;

pub use error::{CacheError, CacheResult};
pub use memory::InMemoryReplayCache;
pub use provider::ReplayCache;
