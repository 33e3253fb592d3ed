//! Block ciphers for XML Encryption `EncryptedData`.
//!
//! CBC modes carry a 16-byte IV prefix and use the XML Encryption padding
//! rule (only the final byte, the pad length, is significant). GCM modes
//! carry a 12-byte nonce prefix and a 16-byte tag suffix.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit, Nonce};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{CryptoError, CryptoResult};
use crate::random::random_bytes;

const AES_BLOCK: usize = 16;
const GCM_NONCE: usize = 12;
const GCM_TAG: usize = 16;

/// Block cipher URIs.
pub mod uris {
    /// AES-128-CBC.
    pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
    /// AES-192-CBC.
    pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
    /// AES-256-CBC.
    pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
    /// AES-128-GCM.
    pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
    /// AES-256-GCM.
    pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";
}

/// Content encryption algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCipher {
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-192 in CBC mode.
    Aes192Cbc,
    /// AES-256 in CBC mode.
    Aes256Cbc,
    /// AES-128 in GCM mode.
    Aes128Gcm,
    /// AES-256 in GCM mode.
    Aes256Gcm,
}

impl BlockCipher {
    /// Algorithm URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Aes128Cbc => uris::AES128_CBC,
            Self::Aes192Cbc => uris::AES192_CBC,
            Self::Aes256Cbc => uris::AES256_CBC,
            Self::Aes128Gcm => uris::AES128_GCM,
            Self::Aes256Gcm => uris::AES256_GCM,
        }
    }

    /// Parses an algorithm URI.
    ///
    /// ## Errors
    ///
    /// Returns an error for unknown URIs.
    pub fn from_uri(uri: &str) -> CryptoResult<Self> {
        match uri {
            uris::AES128_CBC => Ok(Self::Aes128Cbc),
            uris::AES192_CBC => Ok(Self::Aes192Cbc),
            uris::AES256_CBC => Ok(Self::Aes256Cbc),
            uris::AES128_GCM => Ok(Self::Aes128Gcm),
            uris::AES256_GCM => Ok(Self::Aes256Gcm),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("block cipher: {uri}"))),
        }
    }

    /// Key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc | Self::Aes256Gcm => 32,
        }
    }

    /// Decrypts `data` (IV or nonce prefix included).
    ///
    /// ## Errors
    ///
    /// Returns [`CryptoError::Decryption`] on a wrong key length, truncated
    /// input, bad padding or a failed GCM tag check.
    pub fn decrypt(self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        if key.len() != self.key_len() {
            return Err(CryptoError::Decryption(format!(
                "expected a {}-byte key, got {}",
                self.key_len(),
                key.len()
            )));
        }
        match self {
            Self::Aes128Cbc => cbc_decrypt::<Aes128>(key, data),
            Self::Aes192Cbc => cbc_decrypt::<Aes192>(key, data),
            Self::Aes256Cbc => cbc_decrypt::<Aes256>(key, data),
            Self::Aes128Gcm => {
                let (nonce, ciphertext) = split_gcm(data)?;
                Aes128Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))?
                    .decrypt(nonce, ciphertext)
                    .map_err(|_| CryptoError::Decryption("GCM authentication failed".to_string()))
            }
            Self::Aes256Gcm => {
                let (nonce, ciphertext) = split_gcm(data)?;
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::Decryption(e.to_string()))?
                    .decrypt(nonce, ciphertext)
                    .map_err(|_| CryptoError::Decryption("GCM authentication failed".to_string()))
            }
        }
    }

    /// Encrypts `plaintext` under a fresh IV or nonce, prefixed to the output.
    ///
    /// ## Errors
    ///
    /// Returns an error on a wrong key length.
    pub fn encrypt(self, key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        if key.len() != self.key_len() {
            return Err(CryptoError::Encryption(format!(
                "expected a {}-byte key, got {}",
                self.key_len(),
                key.len()
            )));
        }
        match self {
            Self::Aes128Cbc => cbc_encrypt::<Aes128>(key, plaintext),
            Self::Aes192Cbc => cbc_encrypt::<Aes192>(key, plaintext),
            Self::Aes256Cbc => cbc_encrypt::<Aes256>(key, plaintext),
            Self::Aes128Gcm => {
                let nonce = random_bytes(GCM_NONCE);
                let sealed = Aes128Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))?
                    .encrypt(Nonce::from_slice(&nonce), plaintext)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))?;
                Ok([nonce, sealed].concat())
            }
            Self::Aes256Gcm => {
                let nonce = random_bytes(GCM_NONCE);
                let sealed = Aes256Gcm::new_from_slice(key)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))?
                    .encrypt(Nonce::from_slice(&nonce), plaintext)
                    .map_err(|e| CryptoError::Encryption(e.to_string()))?;
                Ok([nonce, sealed].concat())
            }
        }
    }
}

fn split_gcm(data: &[u8]) -> CryptoResult<(&Nonce<aes_gcm::aead::consts::U12>, &[u8])> {
    if data.len() < GCM_NONCE + GCM_TAG {
        return Err(CryptoError::Decryption("GCM ciphertext too short".to_string()));
    }
    let (nonce, rest) = data.split_at(GCM_NONCE);
    Ok((Nonce::from_slice(nonce), rest))
}

fn cbc_decrypt<C>(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>
where
    cbc::Decryptor<C>: KeyIvInit + BlockDecryptMut,
    C: cbc::cipher::BlockCipher + cbc::cipher::BlockDecryptMut,
{
    if data.len() < 2 * AES_BLOCK || data.len() % AES_BLOCK != 0 {
        return Err(CryptoError::Decryption(
            "CBC ciphertext is not a whole number of blocks".to_string(),
        ));
    }
    let (iv, ciphertext) = data.split_at(AES_BLOCK);
    let plain = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    xmlenc_unpad(plain)
}

fn cbc_encrypt<C>(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>>
where
    cbc::Encryptor<C>: KeyIvInit + BlockEncryptMut,
    C: cbc::cipher::BlockCipher + cbc::cipher::BlockEncryptMut,
{
    let iv = random_bytes(AES_BLOCK);
    let ciphertext = cbc::Encryptor::<C>::new_from_slices(key, &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok([iv, ciphertext].concat())
}

/// Strips XML Encryption padding: the last byte is the pad length, the
/// other pad bytes are arbitrary.
fn xmlenc_unpad(mut plain: Vec<u8>) -> CryptoResult<Vec<u8>> {
    let pad = usize::from(*plain.last().ok_or_else(|| {
        CryptoError::Decryption("empty plaintext".to_string())
    })?);
    if pad == 0 || pad > AES_BLOCK || pad > plain.len() {
        return Err(CryptoError::Decryption("invalid padding".to_string()));
    }
    plain.truncate(plain.len() - pad);
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BlockCipher; 5] = [
        BlockCipher::Aes128Cbc,
        BlockCipher::Aes192Cbc,
        BlockCipher::Aes256Cbc,
        BlockCipher::Aes128Gcm,
        BlockCipher::Aes256Gcm,
    ];

    #[test]
    fn decrypts_what_it_encrypts() {
        for cipher in ALL {
            let key = random_bytes(cipher.key_len());
            let sealed = cipher.encrypt(&key, b"<saml:Assertion/>").unwrap();
            assert_eq!(cipher.decrypt(&key, &sealed).unwrap(), b"<saml:Assertion/>");
        }
    }

    #[test]
    fn xmlenc_padding_ignores_filler_bytes() {
        let key = [3u8; 16];
        let iv = [9u8; 16];
        // "abc" + 12 arbitrary bytes + pad length 13
        let mut block = b"abc".to_vec();
        block.extend_from_slice(&[0xAA; 12]);
        block.push(13);
        let ciphertext = cbc::Encryptor::<Aes128>::new_from_slices(&key, &iv)
            .unwrap()
            .encrypt_padded_vec_mut::<NoPadding>(&block);
        let data = [iv.to_vec(), ciphertext].concat();
        assert_eq!(BlockCipher::Aes128Cbc.decrypt(&key, &data).unwrap(), b"abc");
    }

    #[test]
    fn gcm_tampering_is_detected() {
        let key = [5u8; 32];
        let mut sealed = BlockCipher::Aes256Gcm.encrypt(&key, b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            BlockCipher::Aes256Gcm.decrypt(&key, &sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn rejects_wrong_key_length_and_truncated_input() {
        assert!(BlockCipher::Aes128Cbc.decrypt(&[0u8; 32], &[0u8; 32]).is_err());
        assert!(BlockCipher::Aes128Cbc.decrypt(&[0u8; 16], &[0u8; 20]).is_err());
        assert!(BlockCipher::Aes128Gcm.decrypt(&[0u8; 16], &[0u8; 10]).is_err());
    }

    #[test]
    fn uri_lookup() {
        for cipher in ALL {
            assert_eq!(BlockCipher::from_uri(cipher.uri()).unwrap(), cipher);
        }
        assert!(BlockCipher::from_uri("http://www.w3.org/2001/04/xmlenc#tripledes-cbc").is_err());
    }
}
