//! Metadata command.

use std::path::PathBuf;

use crate::CliConfig;

/// Prints the SP metadata.
pub async fn run_metadata(
    config: &CliConfig,
    decryption_cert: Option<PathBuf>,
    signing_cert: Option<PathBuf>,
) -> crate::CliResult<()> {
    let sp = super::service_provider(config).await?;
    let decryption_cert = decryption_cert.map(std::fs::read_to_string).transpose()?;
    let signing_cert = signing_cert.map(std::fs::read_to_string).transpose()?;

    let xml = sp.metadata(decryption_cert.as_deref(), signing_cert.as_deref())?;
    println!("{xml}");
    Ok(())
}
