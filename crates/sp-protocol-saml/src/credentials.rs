//! Parsed key material.
//!
//! IdP certificates are resolved per validation through a
//! [`CertificateProvider`] so deployments can rotate them without
//! rebuilding the service provider; [`StaticCertificates`] serves the ones
//! from configuration.

use async_trait::async_trait;
use sp_crypto::{Certificate, PrivateKey};

use crate::config::SamlConfig;
use crate::error::{SamlError, SamlResult};

/// Source of the certificates IdP signatures are checked against.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    /// Returns every certificate currently trusted. At least one is
    /// expected; an empty list fails every signature check.
    async fn certificates(&self) -> SamlResult<Vec<Certificate>>;
}

/// A fixed list of trusted certificates.
#[derive(Debug, Clone)]
pub struct StaticCertificates {
    certificates: Vec<Certificate>,
}

impl StaticCertificates {
    /// Wraps `certificates`.
    #[must_use]
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }
}

#[async_trait]
impl CertificateProvider for StaticCertificates {
    async fn certificates(&self) -> SamlResult<Vec<Certificate>> {
        Ok(self.certificates.clone())
    }
}

/// Keys and certificates parsed from a [`SamlConfig`].
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Trusted IdP certificates.
    pub idp_certs: Vec<Certificate>,
    /// SP signing key.
    pub signing_key: Option<PrivateKey>,
    /// SP signing certificate, embedded in enveloped signatures.
    pub signing_cert: Option<Certificate>,
    /// SP decryption key.
    pub decryption_key: Option<PrivateKey>,
}

impl Credentials {
    /// Parses every key and certificate in `config`.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Configuration`] naming the setting that does
    /// not parse.
    pub fn from_config(config: &SamlConfig) -> SamlResult<Self> {
        let idp_certs = config
            .idp_cert
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| Certificate::parse(c).map_err(|e| invalid("idp_cert", &e)))
            .collect::<SamlResult<Vec<_>>>()?;

        let signing_key = config
            .private_key
            .as_deref()
            .map(|k| PrivateKey::parse(k).map_err(|e| invalid("private_key", &e)))
            .transpose()?;
        let signing_cert = config
            .signing_cert
            .as_deref()
            .map(|c| Certificate::parse(c).map_err(|e| invalid("signing_cert", &e)))
            .transpose()?;
        let decryption_key = config
            .decryption_pvk
            .as_deref()
            .map(|k| PrivateKey::parse(k).map_err(|e| invalid("decryption_pvk", &e)))
            .transpose()?;

        Ok(Self {
            idp_certs,
            signing_key,
            signing_cert,
            decryption_key,
        })
    }
}

fn invalid(setting: &str, err: &dyn std::fmt::Display) -> SamlError {
    SamlError::Configuration(format!("{setting} is invalid: {err}"))
}
