//! Certificate and private key handling.
//!
//! Certificates and keys reach the service provider in several shapes: full
//! PEM files, PEM with Windows line endings, or the bare base64 body copied
//! out of IdP metadata. Everything is reduced to DER before parsing.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{CryptoError, CryptoResult};

const PEM_LINE_WIDTH: usize = 64;

/// Removes every `-----BEGIN ...-----` / `-----END ...-----` marker and all
/// whitespace, leaving the base64 body.
#[must_use]
pub fn armor_body(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("-----") {
        out.push_str(&rest[..start]);
        let after = rest[start..].trim_start_matches('-');
        match after.find('-') {
            Some(end) => rest = after[end..].trim_start_matches('-'),
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.retain(|c| !c.is_whitespace());
    out
}

/// Returns a certificate as a PEM block wrapped at 64 columns.
#[must_use]
pub fn normalize_certificate(input: &str) -> String {
    wrap_pem("CERTIFICATE", &armor_body(input))
}

/// Returns the certificate body as published in SP metadata: armor removed,
/// line breaks preserved and normalized to `\n`.
#[must_use]
pub fn metadata_certificate_body(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_pem(label: &str, body: &str) -> String {
    let mut pem = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        // body is base64, so every chunk is ASCII
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

/// An X.509 certificate carrying an RSA public key.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    public_key: RsaPublicKey,
}

impl Certificate {
    /// Parses a PEM certificate or a bare base64 DER body.
    ///
    /// ## Errors
    ///
    /// Returns an error if the input is not base64, not a certificate, or the
    /// certificate does not carry an RSA key.
    pub fn parse(input: &str) -> CryptoResult<Self> {
        let der = BASE64.decode(armor_body(input))?;
        Self::from_der(der)
    }

    /// Parses a DER encoded certificate.
    ///
    /// ## Errors
    ///
    /// See [`Certificate::parse`].
    pub fn from_der(der: Vec<u8>) -> CryptoResult<Self> {
        let public_key = {
            let (_, cert) = X509Certificate::from_der(&der)
                .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
            RsaPublicKey::from_public_key_der(cert.public_key().raw).map_err(|e| {
                CryptoError::InvalidCertificate(format!("not an RSA certificate: {e}"))
            })?
        };
        Ok(Self { der, public_key })
    }

    /// DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The subject public key.
    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Base64 DER on a single line, as carried in `ds:X509Certificate`.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.der)
    }

    /// PEM encoding.
    #[must_use]
    pub fn to_pem(&self) -> String {
        wrap_pem("CERTIFICATE", &self.to_base64())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// An RSA private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Parses a PKCS#8 or PKCS#1 key, in PEM form or as a bare base64 body.
    ///
    /// ## Errors
    ///
    /// Returns an error if the key cannot be decoded as either format.
    pub fn parse(input: &str) -> CryptoResult<Self> {
        let der = BASE64.decode(armor_body(input))?;
        let inner = RsaPrivateKey::from_pkcs8_der(&der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The underlying RSA key.
    #[must_use]
    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }

    /// The matching public key.
    #[must_use]
    pub fn public_key(&self) -> RsaPublicKey {
        self.inner.to_public_key()
    }
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(inner: RsaPrivateKey) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey { .. }")
    }
}
