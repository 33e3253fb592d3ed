//! Command implementations.

pub mod authorize;
pub mod decode;
pub mod logout;
pub mod metadata;
pub mod validate;

pub use authorize::{run_authorize_form, run_authorize_url};
pub use decode::run_decode;
pub use logout::run_logout_url;
pub use metadata::run_metadata;
pub use validate::run_validate_response;

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use sp_cache_redis::RedisReplayCache;
use sp_protocol_saml::ServiceProvider;
use tracing::info;

use crate::CliConfig;

/// Builds the service provider, connecting the Redis replay cache when one
/// is configured.
pub async fn service_provider(config: &CliConfig) -> crate::CliResult<ServiceProvider> {
    let sp = ServiceProvider::new(config.saml.clone())?;
    match &config.redis {
        Some(redis) => {
            let ttl = Duration::from_millis(config.saml.request_id_expiration_period_ms);
            let cache = RedisReplayCache::connect(redis.clone(), ttl).await?;
            info!(host = %redis.host, "using redis replay cache");
            Ok(sp.with_cache(Arc::new(cache)))
        }
        None => Ok(sp),
    }
}

/// Returns `value`, or standard input when it is `-`.
pub fn read_argument(value: &str) -> crate::CliResult<String> {
    if value != "-" {
        return Ok(value.to_string());
    }
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input.trim().to_string())
}
