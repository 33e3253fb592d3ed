//! Cryptographic error types.

use thiserror::Error;

/// Error type for cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Algorithm identifier is not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),

    /// Private or public key could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Input was not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
