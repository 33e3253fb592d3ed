//! Single logout command.

use std::collections::BTreeMap;

use sp_protocol_saml::{LogoutSubject, NameId};

use crate::CliConfig;

/// Prints the redirect URL logging `name_id` out at the IdP.
pub async fn run_logout_url(
    config: &CliConfig,
    name_id: &str,
    format: Option<String>,
    session_index: Option<String>,
    relay_state: Option<&str>,
) -> crate::CliResult<()> {
    let sp = super::service_provider(config).await?;

    let mut name_id = NameId::new(name_id);
    name_id.format = format.or_else(|| sp.config().identifier_format().map(str::to_string));
    let subject = LogoutSubject {
        name_id,
        session_index,
    };

    let url = sp.logout_url(&subject, relay_state, &BTreeMap::new()).await?;
    println!("{url}");
    Ok(())
}
