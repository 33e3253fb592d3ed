//! Service provider metadata.

use sp_crypto::pem::metadata_certificate_body;
use sp_crypto::BlockCipher;

use crate::config::SamlConfig;
use crate::error::{SamlError, SamlResult};
use crate::types::{SamlBinding, METADATA_NS, PROTOCOL_SUPPORT, XMLDSIG_NS};
use crate::xml::XmlWriter;

/// Content ciphers advertised on the encryption key, in preference order.
const ADVERTISED_CIPHERS: [BlockCipher; 4] = [
    BlockCipher::Aes256Gcm,
    BlockCipher::Aes128Gcm,
    BlockCipher::Aes256Cbc,
    BlockCipher::Aes128Cbc,
];

/// Generates the SP `EntityDescriptor`.
///
/// `decryption_cert` and `signing_cert` default to the certificates in
/// `config`. A certificate is required for each configured private key.
///
/// ## Errors
///
/// Returns [`SamlError::MissingCredential`] when a key is configured
/// without its certificate.
pub fn generate(
    config: &SamlConfig,
    decryption_cert: Option<&str>,
    signing_cert: Option<&str>,
) -> SamlResult<String> {
    let decryption_cert = decryption_cert.or(config.decryption_cert.as_deref());
    let signing_cert = signing_cert.or(config.signing_cert.as_deref());

    let encryption = match (&config.decryption_pvk, decryption_cert) {
        (Some(_), Some(cert)) => Some(metadata_certificate_body(cert)),
        (Some(_), None) => {
            return Err(SamlError::MissingCredential(
                "Missing decryptionCert while generating metadata for decrypting service provider"
                    .to_string(),
            ))
        }
        (None, _) => None,
    };
    let signing = match (&config.private_key, signing_cert) {
        (Some(_), Some(cert)) => Some(metadata_certificate_body(cert)),
        (Some(_), None) => {
            return Err(SamlError::MissingCredential(
                "Missing signingCert while generating metadata for signing service provider messages"
                    .to_string(),
            ))
        }
        (None, _) => None,
    };

    let entity_id = config.issuer.as_str();
    let descriptor_id = entity_id.replace(|c: char| !(c.is_ascii_alphanumeric() || c == '_'), "_");
    let want_signed = config.want_assertions_signed.then_some("true");

    let mut writer = XmlWriter::indented();
    writer.declaration()?;
    writer.start(
        "EntityDescriptor",
        &[
            ("xmlns", METADATA_NS),
            ("xmlns:ds", XMLDSIG_NS),
            ("entityID", entity_id),
            ("ID", descriptor_id.as_str()),
        ],
    )?;

    let mut descriptor_attrs = vec![("protocolSupportEnumeration", PROTOCOL_SUPPORT)];
    if let Some(want_signed) = want_signed {
        descriptor_attrs.push(("WantAssertionsSigned", want_signed));
    }
    writer.start("SPSSODescriptor", &descriptor_attrs)?;

    if let Some(cert) = &signing {
        key_descriptor(&mut writer, "signing", cert, false)?;
    }
    if let Some(cert) = &encryption {
        key_descriptor(&mut writer, "encryption", cert, true)?;
    }

    if let Some(logout_callback) = config.logout_callback_url.as_deref() {
        writer.empty(
            "SingleLogoutService",
            &[("Binding", SamlBinding::HttpPost.uri()), ("Location", logout_callback)],
        )?;
    }
    if let Some(format) = config.identifier_format() {
        writer.text_element("NameIDFormat", &[], format)?;
    }

    let callback_url = config.callback_url(None);
    writer.empty(
        "AssertionConsumerService",
        &[
            ("index", "1"),
            ("isDefault", "true"),
            ("Binding", SamlBinding::HttpPost.uri()),
            ("Location", callback_url.as_str()),
        ],
    )?;

    writer.end("SPSSODescriptor")?;
    writer.end("EntityDescriptor")?;
    writer.finish()
}

fn key_descriptor(writer: &mut XmlWriter, usage: &str, cert: &str, ciphers: bool) -> SamlResult<()> {
    writer.start("KeyDescriptor", &[("use", usage)])?;
    writer.start("ds:KeyInfo", &[])?;
    writer.start("ds:X509Data", &[])?;
    writer.text_element("ds:X509Certificate", &[], cert)?;
    writer.end("ds:X509Data")?;
    writer.end("ds:KeyInfo")?;
    if ciphers {
        for cipher in ADVERTISED_CIPHERS {
            writer.empty("EncryptionMethod", &[("Algorithm", cipher.uri())])?;
        }
    }
    writer.end("KeyDescriptor")
}
