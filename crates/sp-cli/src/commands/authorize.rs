//! Single sign-on commands.

use std::collections::BTreeMap;

use crate::output::info;
use crate::CliConfig;

/// Prints the redirect URL starting single sign-on.
pub async fn run_authorize_url(
    config: &CliConfig,
    relay_state: Option<&str>,
    host: Option<&str>,
    params: Vec<(String, String)>,
) -> crate::CliResult<()> {
    let sp = super::service_provider(config).await?;
    let params: BTreeMap<_, _> = params.into_iter().collect();
    let url = sp.authorize_url(relay_state, host, &params).await?;
    if config.redis.is_none() && sp.config().validate_in_response_to {
        info("request ID is only tracked in memory; configure [redis] to validate the response later");
    }
    println!("{url}");
    Ok(())
}

/// Prints the auto-submitting form starting single sign-on.
pub async fn run_authorize_form(
    config: &CliConfig,
    relay_state: Option<&str>,
    host: Option<&str>,
) -> crate::CliResult<()> {
    let sp = super::service_provider(config).await?;
    let form = sp.authorize_form(relay_state, host).await?;
    println!("{form}");
    Ok(())
}
