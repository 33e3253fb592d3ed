//! RSA key transport for XML Encryption `EncryptedKey` elements.

use rsa::rand_core::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::digest::{Digest, DynDigest};
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithm::HashAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::pem::PrivateKey;

/// Key transport algorithm URIs.
pub mod uris {
    /// RSA PKCS#1 v1.5.
    pub const RSA_1_5: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";
    /// RSA-OAEP with MGF1/SHA-1 (XML Encryption 1.0).
    pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
    /// RSA-OAEP (XML Encryption 1.1).
    pub const RSA_OAEP: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";
    /// MGF1 with SHA-1.
    pub const MGF1_SHA1: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha1";
    /// MGF1 with SHA-256.
    pub const MGF1_SHA256: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha256";
    /// MGF1 with SHA-384.
    pub const MGF1_SHA384: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha384";
    /// MGF1 with SHA-512.
    pub const MGF1_SHA512: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha512";
}

/// Key transport algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransport {
    /// RSA PKCS#1 v1.5.
    Rsa15,
    /// RSA-OAEP, MGF1 fixed to SHA-1.
    RsaOaepMgf1p,
    /// RSA-OAEP with selectable MGF.
    RsaOaep,
}

/// OAEP parameters taken from `EncryptionMethod` children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OaepParams {
    /// Label digest (`ds:DigestMethod`), SHA-1 when absent.
    pub digest: HashAlgorithm,
    /// Mask generation hash (`xenc11:MGF`), SHA-1 when absent.
    pub mgf: HashAlgorithm,
}

impl Default for OaepParams {
    fn default() -> Self {
        Self {
            digest: HashAlgorithm::Sha1,
            mgf: HashAlgorithm::Sha1,
        }
    }
}

/// Resolves an `xenc11:MGF` algorithm URI.
///
/// ## Errors
///
/// Returns an error for unknown URIs.
pub fn mgf_from_uri(uri: &str) -> CryptoResult<HashAlgorithm> {
    match uri {
        uris::MGF1_SHA1 => Ok(HashAlgorithm::Sha1),
        uris::MGF1_SHA256 => Ok(HashAlgorithm::Sha256),
        uris::MGF1_SHA384 => Ok(HashAlgorithm::Sha384),
        uris::MGF1_SHA512 => Ok(HashAlgorithm::Sha512),
        _ => Err(CryptoError::UnsupportedAlgorithm(uri.to_string())),
    }
}

impl KeyTransport {
    /// Algorithm URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Rsa15 => uris::RSA_1_5,
            Self::RsaOaepMgf1p => uris::RSA_OAEP_MGF1P,
            Self::RsaOaep => uris::RSA_OAEP,
        }
    }

    /// Parses an algorithm URI.
    ///
    /// ## Errors
    ///
    /// Returns an error for unknown URIs.
    pub fn from_uri(uri: &str) -> CryptoResult<Self> {
        match uri {
            uris::RSA_1_5 => Ok(Self::Rsa15),
            uris::RSA_OAEP_MGF1P => Ok(Self::RsaOaepMgf1p),
            uris::RSA_OAEP => Ok(Self::RsaOaep),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("key transport: {uri}"))),
        }
    }

    /// Decrypts a wrapped content-encryption key.
    ///
    /// ## Errors
    ///
    /// Returns [`CryptoError::Decryption`] when the ciphertext does not
    /// decrypt under `key`.
    pub fn unwrap_key(
        self,
        key: &PrivateKey,
        wrapped: &[u8],
        params: OaepParams,
    ) -> CryptoResult<Vec<u8>> {
        let key = key.rsa();
        match self {
            Self::Rsa15 => key
                .decrypt(Pkcs1v15Encrypt, wrapped)
                .map_err(|e| CryptoError::Decryption(format!("rsa-1_5: {e}"))),
            Self::RsaOaepMgf1p => oaep_decrypt_with_digest(key, wrapped, params.digest, HashAlgorithm::Sha1),
            Self::RsaOaep => oaep_decrypt_with_digest(key, wrapped, params.digest, params.mgf),
        }
    }

    /// Encrypts a content-encryption key for `recipient`.
    ///
    /// The service provider only ever decrypts; this direction exists for
    /// identity provider tooling and tests.
    ///
    /// ## Errors
    ///
    /// Returns an error if the key is too long for the RSA modulus.
    pub fn wrap_key(
        self,
        recipient: &RsaPublicKey,
        cek: &[u8],
        params: OaepParams,
    ) -> CryptoResult<Vec<u8>> {
        let mut rng = OsRng;
        let result = match self {
            Self::Rsa15 => recipient.encrypt(&mut rng, Pkcs1v15Encrypt, cek),
            Self::RsaOaepMgf1p => recipient.encrypt(&mut rng, oaep_padding(params.digest, HashAlgorithm::Sha1), cek),
            Self::RsaOaep => recipient.encrypt(&mut rng, oaep_padding(params.digest, params.mgf), cek),
        };
        result.map_err(|e| CryptoError::Encryption(format!("key wrap: {e}")))
    }
}

fn oaep<D, M>() -> Oaep
where
    D: 'static + Digest + DynDigest + Send + Sync,
    M: 'static + Digest + DynDigest + Send + Sync,
{
    Oaep::new_with_mgf_hash::<D, M>()
}

fn oaep_with_mgf<D>(mgf: HashAlgorithm) -> Oaep
where
    D: 'static + Digest + DynDigest + Send + Sync,
{
    match mgf {
        HashAlgorithm::Sha1 => oaep::<D, Sha1>(),
        HashAlgorithm::Sha256 => oaep::<D, Sha256>(),
        HashAlgorithm::Sha384 => oaep::<D, Sha384>(),
        HashAlgorithm::Sha512 => oaep::<D, Sha512>(),
    }
}

fn oaep_padding(digest: HashAlgorithm, mgf: HashAlgorithm) -> Oaep {
    match digest {
        HashAlgorithm::Sha1 => oaep_with_mgf::<Sha1>(mgf),
        HashAlgorithm::Sha256 => oaep_with_mgf::<Sha256>(mgf),
        HashAlgorithm::Sha384 => oaep_with_mgf::<Sha384>(mgf),
        HashAlgorithm::Sha512 => oaep_with_mgf::<Sha512>(mgf),
    }
}

fn oaep_decrypt_with_digest(
    key: &RsaPrivateKey,
    wrapped: &[u8],
    digest: HashAlgorithm,
    mgf: HashAlgorithm,
) -> CryptoResult<Vec<u8>> {
    key.decrypt(oaep_padding(digest, mgf), wrapped)
        .map_err(|e| CryptoError::Decryption(format!("rsa-oaep: {e}")))
}
