//! Algorithm registry.
//!
//! Maps the identifiers that appear in SAML messages (XML-DSig URIs, the
//! `SigAlg` query parameter, configuration names) to the hash and signature
//! primitives implemented by this crate.

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// XML-DSig algorithm URIs.
pub mod uris {
    /// SHA-1 digest.
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    /// SHA-256 digest.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    /// SHA-384 digest.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
    /// SHA-512 digest.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

    /// RSA PKCS#1 v1.5 with SHA-1.
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
    /// RSA PKCS#1 v1.5 with SHA-256.
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
    /// RSA PKCS#1 v1.5 with SHA-384.
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
    /// RSA PKCS#1 v1.5 with SHA-512.
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";
}

/// Hash algorithms usable for digests and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 (legacy, still the SAML default).
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Returns the short algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the XML-DSig `DigestMethod` URI.
    #[must_use]
    pub const fn digest_uri(self) -> &'static str {
        match self {
            Self::Sha1 => uris::SHA1,
            Self::Sha256 => uris::SHA256,
            Self::Sha384 => uris::SHA384,
            Self::Sha512 => uris::SHA512,
        }
    }

    /// Parses a `DigestMethod` URI.
    ///
    /// ## Errors
    ///
    /// Returns an error for unknown URIs.
    pub fn from_digest_uri(uri: &str) -> CryptoResult<Self> {
        match uri {
            uris::SHA1 => Ok(Self::Sha1),
            uris::SHA256 => Ok(Self::Sha256),
            uris::SHA384 => Ok(Self::Sha384),
            uris::SHA512 => Ok(Self::Sha512),
            _ => Err(CryptoError::UnsupportedAlgorithm(uri.to_string())),
        }
    }

    /// Parses a short name such as `sha256` (case-insensitive).
    ///
    /// ## Errors
    ///
    /// Returns an error for unknown names.
    pub fn from_name(name: &str) -> CryptoResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(CryptoError::UnsupportedAlgorithm(name.to_string())),
        }
    }
}

/// RSA signature algorithms used by XML-DSig and the redirect binding.
///
/// Configuration refers to these by their hash name, so `"sha256"` selects
/// [`SignatureAlgorithm::RsaSha256`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1.
    #[default]
    #[serde(rename = "sha1")]
    RsaSha1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "sha256")]
    RsaSha256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "sha384")]
    RsaSha384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "sha512")]
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the XML-DSig `SignatureMethod` URI, also used as `SigAlg`.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::RsaSha1 => uris::RSA_SHA1,
            Self::RsaSha256 => uris::RSA_SHA256,
            Self::RsaSha384 => uris::RSA_SHA384,
            Self::RsaSha512 => uris::RSA_SHA512,
        }
    }

    /// Returns the hash used by this algorithm.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha1 => HashAlgorithm::Sha1,
            Self::RsaSha256 => HashAlgorithm::Sha256,
            Self::RsaSha384 => HashAlgorithm::Sha384,
            Self::RsaSha512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns the RSA signature algorithm built on `hash`.
    #[must_use]
    pub const fn from_hash(hash: HashAlgorithm) -> Self {
        match hash {
            HashAlgorithm::Sha1 => Self::RsaSha1,
            HashAlgorithm::Sha256 => Self::RsaSha256,
            HashAlgorithm::Sha384 => Self::RsaSha384,
            HashAlgorithm::Sha512 => Self::RsaSha512,
        }
    }

    /// Parses a `SignatureMethod` URI.
    ///
    /// ## Errors
    ///
    /// Returns an error for unknown URIs.
    pub fn from_uri(uri: &str) -> CryptoResult<Self> {
        match uri {
            uris::RSA_SHA1 => Ok(Self::RsaSha1),
            uris::RSA_SHA256 => Ok(Self::RsaSha256),
            uris::RSA_SHA384 => Ok(Self::RsaSha384),
            uris::RSA_SHA512 => Ok(Self::RsaSha512),
            _ => Err(CryptoError::UnsupportedAlgorithm(uri.to_string())),
        }
    }

    /// Resolves the `SigAlg` parameter of a redirect-binding message.
    ///
    /// Only the fragment after the last `#` is considered and compared
    /// case-insensitively, so `...xmldsig-more#RSA-SHA256` and `rsa-sha256`
    /// resolve to the same algorithm.
    ///
    /// ## Errors
    ///
    /// Returns an error when no supported algorithm matches.
    pub fn from_sig_alg(sig_alg: &str) -> CryptoResult<Self> {
        let suffix = sig_alg.rsplit('#').next().unwrap_or(sig_alg);
        match suffix.to_ascii_lowercase().as_str() {
            "rsa-sha1" | "sha1" => Ok(Self::RsaSha1),
            "rsa-sha256" | "sha256" => Ok(Self::RsaSha256),
            "rsa-sha384" | "sha384" => Ok(Self::RsaSha384),
            "rsa-sha512" | "sha512" => Ok(Self::RsaSha512),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "{sig_alg} is not supported"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_signature_algorithm_is_sha1() {
        assert_eq!(SignatureAlgorithm::default(), SignatureAlgorithm::RsaSha1);
        assert_eq!(SignatureAlgorithm::default().uri(), uris::RSA_SHA1);
    }

    #[test]
    fn sig_alg_suffix_match_is_case_insensitive() {
        assert_eq!(
            SignatureAlgorithm::from_sig_alg("http://www.w3.org/2001/04/xmldsig-more#RSA-SHA256")
                .unwrap(),
            SignatureAlgorithm::RsaSha256
        );
        assert_eq!(
            SignatureAlgorithm::from_sig_alg(uris::RSA_SHA1).unwrap(),
            SignatureAlgorithm::RsaSha1
        );
    }

    #[test]
    fn unknown_sig_alg_is_an_error() {
        let result = SignatureAlgorithm::from_sig_alg("http://www.w3.org/2001/04/xmldsig-more#hmac-md5");
        assert!(matches!(result, Err(CryptoError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn digest_uri_lookup() {
        assert_eq!(
            HashAlgorithm::from_digest_uri(uris::SHA256).unwrap(),
            HashAlgorithm::Sha256
        );
        assert!(HashAlgorithm::from_digest_uri("urn:md5").is_err());
    }

    #[test]
    fn configuration_names_deserialize() {
        let alg: SignatureAlgorithm = serde_json::from_str("\"sha512\"").unwrap();
        assert_eq!(alg, SignatureAlgorithm::RsaSha512);
        assert_eq!(HashAlgorithm::from_name("SHA256").unwrap(), HashAlgorithm::Sha256);
    }
}
