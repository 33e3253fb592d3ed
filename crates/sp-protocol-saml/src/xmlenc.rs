//! XML Encryption for `EncryptedAssertion` and `EncryptedID`.
//!
//! The content key is carried in an `xenc:EncryptedKey`, either inside the
//! `EncryptedData`'s `ds:KeyInfo` or as a sibling of `EncryptedData` in the
//! container. Decrypted content is returned as text and parsed by the
//! caller as a standalone document.

use base64::Engine;
use roxmltree::Node;
use rsa::RsaPublicKey;
use sp_crypto::keytransport::{self, mgf_from_uri, OaepParams};
use sp_crypto::{random_bytes, BlockCipher, HashAlgorithm, KeyTransport, PrivateKey};

use crate::error::{SamlError, SamlResult};
use crate::types::{XMLDSIG_NS, XMLENC11_NS, XMLENC_NS};
use crate::xml::{child, child_text, decode_base64_text, is_element, XmlWriter};

const ELEMENT_TYPE: &str = "http://www.w3.org/2001/04/xmlenc#Element";

/// Decrypts the `EncryptedData` inside `container` with `key`.
///
/// `container` may be the `EncryptedData` element itself.
///
/// ## Errors
///
/// Returns [`SamlError::ProtocolShape`] when required elements are
/// missing, and [`SamlError::Crypto`] for unsupported algorithms or
/// failed decryption.
pub fn decrypt_element(container: Node<'_, '_>, key: &PrivateKey) -> SamlResult<String> {
    let encrypted_data = if is_element(container, XMLENC_NS, "EncryptedData") {
        container
    } else {
        child(container, XMLENC_NS, "EncryptedData")
            .ok_or_else(|| shape("Missing EncryptedData"))?
    };

    let cipher = algorithm(encrypted_data).ok_or_else(|| shape("Missing EncryptionMethod"))?;
    let cipher = BlockCipher::from_uri(cipher)?;

    let encrypted_key = child(encrypted_data, XMLDSIG_NS, "KeyInfo")
        .and_then(|key_info| child(key_info, XMLENC_NS, "EncryptedKey"))
        .or_else(|| child(container, XMLENC_NS, "EncryptedKey"))
        .ok_or_else(|| shape("Missing EncryptedKey"))?;

    let transport =
        algorithm(encrypted_key).ok_or_else(|| shape("Missing EncryptedKey EncryptionMethod"))?;
    let transport = KeyTransport::from_uri(transport)?;
    let params = oaep_params(encrypted_key)?;

    let wrapped = cipher_value(encrypted_key)?;
    let mut content_key = transport.unwrap_key(key, &wrapped, params)?;
    if content_key.len() < cipher.key_len() {
        return Err(SamlError::Crypto(sp_crypto::CryptoError::Decryption(
            "content key is too short".to_string(),
        )));
    }
    content_key.truncate(cipher.key_len());

    let plaintext = cipher.decrypt(&content_key, &cipher_value(encrypted_data)?)?;
    Ok(String::from_utf8(plaintext)?)
}

fn algorithm<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    child(node, XMLENC_NS, "EncryptionMethod").and_then(|m| m.attribute("Algorithm"))
}

fn oaep_params(encrypted_key: Node<'_, '_>) -> SamlResult<OaepParams> {
    let mut params = OaepParams::default();
    let Some(method) = child(encrypted_key, XMLENC_NS, "EncryptionMethod") else {
        return Ok(params);
    };
    if let Some(uri) = child(method, XMLDSIG_NS, "DigestMethod").and_then(|n| n.attribute("Algorithm")) {
        params.digest = HashAlgorithm::from_digest_uri(uri)?;
    }
    if let Some(uri) = child(method, XMLENC11_NS, "MGF").and_then(|n| n.attribute("Algorithm")) {
        params.mgf = mgf_from_uri(uri)?;
    }
    Ok(params)
}

fn cipher_value(node: Node<'_, '_>) -> SamlResult<Vec<u8>> {
    let data = child(node, XMLENC_NS, "CipherData").ok_or_else(|| shape("Missing CipherData"))?;
    let text = child_text(data, XMLENC_NS, "CipherValue")
        .ok_or_else(|| shape("Missing CipherValue"))?;
    decode_base64_text(&text)
}

fn mgf_uri(hash: HashAlgorithm) -> &'static str {
    match hash {
        HashAlgorithm::Sha1 => keytransport::uris::MGF1_SHA1,
        HashAlgorithm::Sha256 => keytransport::uris::MGF1_SHA256,
        HashAlgorithm::Sha384 => keytransport::uris::MGF1_SHA384,
        HashAlgorithm::Sha512 => keytransport::uris::MGF1_SHA512,
    }
}

fn shape(message: &str) -> SamlError {
    SamlError::ProtocolShape(message.to_string())
}

/// Encrypts XML fragments for a recipient certificate.
///
/// The service provider only decrypts; this is the identity provider side,
/// used by tooling and tests.
pub struct XmlEncryptor {
    recipient: RsaPublicKey,
    cipher: BlockCipher,
    transport: KeyTransport,
    params: OaepParams,
}

impl XmlEncryptor {
    /// AES-256-CBC content encryption with RSA-OAEP (MGF1-SHA1) key transport.
    #[must_use]
    pub fn new(recipient: RsaPublicKey) -> Self {
        Self {
            recipient,
            cipher: BlockCipher::Aes256Cbc,
            transport: KeyTransport::RsaOaepMgf1p,
            params: OaepParams::default(),
        }
    }

    /// Sets the content cipher.
    #[must_use]
    pub const fn with_cipher(mut self, cipher: BlockCipher) -> Self {
        self.cipher = cipher;
        self
    }

    /// Sets the key transport and its OAEP parameters.
    #[must_use]
    pub const fn with_transport(mut self, transport: KeyTransport, params: OaepParams) -> Self {
        self.transport = transport;
        self.params = params;
        self
    }

    /// Encrypts `fragment` and wraps it in `<{container} xmlns:{prefix}="{ns}">`,
    /// e.g. `saml:EncryptedAssertion`.
    ///
    /// ## Errors
    ///
    /// Fails when key wrapping or encryption fails.
    pub fn encrypt(&self, fragment: &str, container: &str, container_ns: &str) -> SamlResult<String> {
        let engine = base64::engine::general_purpose::STANDARD;
        let content_key = random_bytes(self.cipher.key_len());
        let ciphertext = self.cipher.encrypt(&content_key, fragment.as_bytes())?;
        let wrapped = self
            .transport
            .wrap_key(&self.recipient, &content_key, self.params)?;

        let xmlns = match container.split_once(':') {
            Some((prefix, _)) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };

        let mut writer = XmlWriter::new();
        writer.start(container, &[(xmlns.as_str(), container_ns)])?;
        writer.start(
            "xenc:EncryptedData",
            &[("xmlns:xenc", XMLENC_NS), ("Type", ELEMENT_TYPE)],
        )?;
        writer.empty("xenc:EncryptionMethod", &[("Algorithm", self.cipher.uri())])?;
        writer.start("ds:KeyInfo", &[("xmlns:ds", XMLDSIG_NS)])?;
        writer.start("xenc:EncryptedKey", &[])?;
        writer.start("xenc:EncryptionMethod", &[("Algorithm", self.transport.uri())])?;
        if self.transport != KeyTransport::Rsa15 {
            writer.empty("ds:DigestMethod", &[("Algorithm", self.params.digest.digest_uri())])?;
        }
        if self.transport == KeyTransport::RsaOaep && self.params.mgf != HashAlgorithm::Sha1 {
            let mgf = mgf_uri(self.params.mgf);
            writer.empty("xenc11:MGF", &[("xmlns:xenc11", XMLENC11_NS), ("Algorithm", mgf)])?;
        }
        writer.end("xenc:EncryptionMethod")?;
        writer.start("xenc:CipherData", &[])?;
        writer.text_element("xenc:CipherValue", &[], &engine.encode(wrapped))?;
        writer.end("xenc:CipherData")?;
        writer.end("xenc:EncryptedKey")?;
        writer.end("ds:KeyInfo")?;
        writer.start("xenc:CipherData", &[])?;
        writer.text_element("xenc:CipherValue", &[], &engine.encode(ciphertext))?;
        writer.end("xenc:CipherData")?;
        writer.end("xenc:EncryptedData")?;
        writer.end(container)?;
        writer.finish()
    }
}
