//! # sp-crypto
//!
//! Cryptographic primitives for the SAML service provider.
//!
//! The SAML profiles in use today still require RSA-SHA1 and the XML
//! Encryption padding rules, so everything here is built on the RustCrypto
//! crates rather than a FIPS-only provider.
//!
//! - [`algorithm`]: XML-DSig / `SigAlg` identifiers
//! - [`hash`]: message digests
//! - [`pem`]: certificate and private key handling
//! - [`signature`]: RSA PKCS#1 v1.5 signing and verification
//! - [`keytransport`]: RSA key transport for `EncryptedKey`
//! - [`cipher`]: block ciphers for `EncryptedData`
//! - [`random`]: request identifiers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithm;
pub mod cipher;
pub mod error;
pub mod hash;
pub mod keytransport;
pub mod pem;
pub mod random;
pub mod signature;

pub use algorithm::{HashAlgorithm, SignatureAlgorithm};
pub use cipher::BlockCipher;
pub use error::{CryptoError, CryptoResult};
pub use hash::digest;
pub use keytransport::KeyTransport;
pub use pem::{Certificate, PrivateKey};
pub use random::{generate_request_id, random_bytes};
pub use signature::{sign, verify};
