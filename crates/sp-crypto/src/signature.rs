//! RSA PKCS#1 v1.5 signatures.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::algorithm::SignatureAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::pem::{Certificate, PrivateKey};

/// Signs `data` with `key`.
///
/// ## Errors
///
/// Returns an error if the key is too small for the digest.
pub fn sign(algorithm: SignatureAlgorithm, key: &PrivateKey, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let key = key.rsa().clone();
    let signature = match algorithm {
        SignatureAlgorithm::RsaSha1 => SigningKey::<Sha1>::new(key).try_sign(data),
        SignatureAlgorithm::RsaSha256 => SigningKey::<Sha256>::new(key).try_sign(data),
        SignatureAlgorithm::RsaSha384 => SigningKey::<Sha384>::new(key).try_sign(data),
        SignatureAlgorithm::RsaSha512 => SigningKey::<Sha512>::new(key).try_sign(data),
    }
    .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Verifies `signature` over `data` with a single public key.
#[must_use]
pub fn verify(
    algorithm: SignatureAlgorithm,
    key: &RsaPublicKey,
    data: &[u8],
    signature: &[u8],
) -> bool {
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    let key = key.clone();
    match algorithm {
        SignatureAlgorithm::RsaSha1 => VerifyingKey::<Sha1>::new(key).verify(data, &signature),
        SignatureAlgorithm::RsaSha256 => VerifyingKey::<Sha256>::new(key).verify(data, &signature),
        SignatureAlgorithm::RsaSha384 => VerifyingKey::<Sha384>::new(key).verify(data, &signature),
        SignatureAlgorithm::RsaSha512 => VerifyingKey::<Sha512>::new(key).verify(data, &signature),
    }
    .is_ok()
}

/// Verifies against each certificate in turn, returning the first match.
#[must_use]
pub fn verify_with_any<'a>(
    algorithm: SignatureAlgorithm,
    certificates: &'a [Certificate],
    data: &[u8],
    signature: &[u8],
) -> Option<&'a Certificate> {
    certificates
        .iter()
        .find(|cert| verify(algorithm, cert.public_key(), data, signature))
}
