//! Errors reported by `saml-sp`.

use std::path::PathBuf;

use thiserror::Error;

/// Why a command failed. Printed once and mapped to exit status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// `saml-sp.toml` is not valid TOML or has unknown values.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A certificate or key file named by the configuration.
    #[error("cannot read {}: {source}", path.display())]
    KeyFile {
        /// Resolved path.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Building or validating a message.
    #[error(transparent)]
    Saml(#[from] sp_protocol_saml::SamlError),

    /// Redis refused or timed out.
    #[error("replay cache error: {0}")]
    Cache(#[from] sp_cache::CacheError),

    /// Reading standard input or an argument file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `--output json` serialization.
    #[error("cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value passed on the command line is unusable.
    #[error("{0}")]
    InvalidArgument(String),
}

/// Result of a command.
pub type CliResult<T> = Result<T, CliError>;
