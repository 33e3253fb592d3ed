//! SAML error types.
//!
//! Every failure in the service provider maps to one of a small set of
//! kinds so the HTTP layer can decide how to answer without inspecting
//! message text. The message itself is the human readable reason and is
//! safe to log: it never contains key material or assertion content.

use sp_cache::CacheError;
use sp_crypto::CryptoError;
use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Input could not be decoded or parsed as XML.
    #[error("{0}")]
    MalformedMessage(String),

    /// Signature missing, invalid, or covering the wrong content.
    #[error("{0}")]
    InvalidSignature(String),

    /// `InResponseTo` missing, unknown, expired or already consumed.
    #[error("{0}")]
    Replay(String),

    /// A `NotBefore` / `NotOnOrAfter` window was not satisfied.
    #[error("{0}")]
    Temporal(String),

    /// Audience restriction did not name this service provider.
    #[error("{0}")]
    Audience(String),

    /// A key or certificate needed for the operation is not configured.
    #[error("{0}")]
    MissingCredential(String),

    /// The message is well-formed XML but not a shape we accept.
    #[error("{0}")]
    ProtocolShape(String),

    /// The identity provider answered with a non-success status.
    #[error("{message}")]
    Status {
        /// Summary built from the status code and message.
        message: String,
        /// The raw `samlp:Status` element.
        status_xml: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Replay cache failure.
    #[error("replay cache error: {0}")]
    Cache(#[from] CacheError),

    /// Cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Internal error while producing output.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MalformedMessage(_) | Self::ProtocolShape(_) => 400,
            Self::InvalidSignature(_)
            | Self::Replay(_)
            | Self::Temporal(_)
            | Self::Audience(_)
            | Self::Status { .. } => 401,
            Self::Crypto(CryptoError::UnsupportedAlgorithm(_)) => 400,
            Self::Cache(_) => 503,
            Self::MissingCredential(_)
            | Self::Configuration(_)
            | Self::Crypto(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Short kind label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedMessage(_) => "malformed_message",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::Replay(_) => "replay",
            Self::Temporal(_) => "temporal",
            Self::Audience(_) => "audience",
            Self::MissingCredential(_) => "missing_credential",
            Self::ProtocolShape(_) => "protocol_shape",
            Self::Status { .. } => "status",
            Self::Configuration(_) => "configuration",
            Self::Cache(_) => "cache",
            Self::Crypto(_) => "crypto",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<roxmltree::Error> for SamlError {
    fn from(err: roxmltree::Error) -> Self {
        Self::MalformedMessage(format!("XML parsing error: {err}"))
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Internal(format!("XML writer error: {err}"))
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedMessage(format!("base64 decode error: {err}"))
    }
}

impl From<std::io::Error> for SamlError {
    fn from(err: std::io::Error) -> Self {
        Self::MalformedMessage(format!("deflate error: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for SamlError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::MalformedMessage(format!("message is not valid UTF-8: {err}"))
    }
}
