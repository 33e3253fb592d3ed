//! Response validation command.

use tracing::warn;

use crate::output::{self, OutputFormat};
use crate::CliConfig;

/// Validates a posted `SAMLResponse` and prints the outcome.
pub async fn run_validate_response(
    config: &CliConfig,
    response: &str,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let sp = super::service_provider(config).await?;
    let response = super::read_argument(response)?;
    let outcome = sp.validate_post_response(&response).await.inspect_err(|err| {
        warn!(kind = err.kind(), "response rejected");
    })?;
    output::outcome(&outcome, format)
}
