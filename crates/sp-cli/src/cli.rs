//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::output::OutputFormat;

/// saml-sp - SAML 2.0 service provider tool.
#[derive(Debug, Parser)]
#[command(name = "saml-sp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, env = "SAML_SP_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the service provider metadata.
    Metadata {
        /// Decryption certificate file (overrides config).
        #[arg(long)]
        decryption_cert: Option<PathBuf>,

        /// Signing certificate file (overrides config).
        #[arg(long)]
        signing_cert: Option<PathBuf>,
    },

    /// Print a redirect URL starting single sign-on.
    AuthorizeUrl {
        /// Relay state returned by the IdP.
        #[arg(long)]
        relay_state: Option<String>,

        /// Host used to derive the callback URL.
        #[arg(long)]
        host: Option<String>,

        /// Extra query parameter, `key=value`. Repeatable.
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Print an auto-submitting HTML form starting single sign-on.
    AuthorizeForm {
        /// Relay state returned by the IdP.
        #[arg(long)]
        relay_state: Option<String>,

        /// Host used to derive the callback URL.
        #[arg(long)]
        host: Option<String>,
    },

    /// Print a redirect URL logging a user out at the IdP.
    LogoutUrl {
        /// Name ID of the user.
        name_id: String,

        /// Name ID format URI.
        #[arg(long)]
        format: Option<String>,

        /// IdP session index.
        #[arg(long)]
        session_index: Option<String>,

        /// Relay state returned by the IdP.
        #[arg(long)]
        relay_state: Option<String>,
    },

    /// Decode a SAMLRequest or SAMLResponse value to XML.
    Decode {
        /// Encoded message; `-` reads standard input.
        message: String,
    },

    /// Validate a base64 SAMLResponse as posted to the callback URL.
    ValidateResponse {
        /// Encoded response; `-` reads standard input.
        response: String,
    },
}

/// Parses `key=value`.
fn parse_key_value(input: &str) -> Result<(String, String), String> {
    input
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{input}`"))
}
