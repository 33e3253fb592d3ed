//! XML Signature creation.
//!
//! Produces enveloped, exclusive-canonicalized signatures. The signature
//! is placed right after the signed element's `saml:Issuer`, or as its
//! first child when there is no issuer, as the SAML schema requires.

use base64::Engine;
use roxmltree::Node;
use sp_crypto::{digest, sign, Certificate, HashAlgorithm, PrivateKey, SignatureAlgorithm};

use crate::error::{SamlError, SamlResult};
use crate::types::{SAML_NS, XMLDSIG_NS};
use crate::xml::{c14n::canonicalize, child, parse_document, C14nMethod, XmlWriter};

use super::ENVELOPED_SIGNATURE;

/// XML document signer.
pub struct XmlSigner {
    key: PrivateKey,
    certificate: Option<Certificate>,
    algorithm: SignatureAlgorithm,
    digest: Option<HashAlgorithm>,
}

impl XmlSigner {
    /// Creates a signer. `certificate` is embedded in `KeyInfo` when set.
    #[must_use]
    pub fn new(key: PrivateKey, certificate: Option<Certificate>) -> Self {
        Self {
            key,
            certificate,
            algorithm: SignatureAlgorithm::default(),
            digest: None,
        }
    }

    /// Sets the signature algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the reference digest. Defaults to the signature's hash.
    #[must_use]
    pub const fn with_digest(mut self, digest: Option<HashAlgorithm>) -> Self {
        self.digest = digest;
        self
    }

    /// Signs the document element.
    ///
    /// ## Errors
    ///
    /// Fails when the input is not XML, the root has no `ID`, or signing
    /// fails.
    pub fn sign_root(&self, xml: &str) -> SamlResult<String> {
        let doc = parse_document(xml)?;
        let root = doc.root_element();
        self.sign_node(xml, root)
    }

    /// Signs the element whose `ID` attribute is `id`.
    ///
    /// ## Errors
    ///
    /// Fails when no element has that `ID`, or signing fails.
    pub fn sign_element(&self, xml: &str, id: &str) -> SamlResult<String> {
        let doc = parse_document(xml)?;
        let target = doc
            .descendants()
            .find(|n| n.is_element() && n.attribute("ID") == Some(id))
            .ok_or_else(|| SamlError::Internal(format!("no element with ID {id}")))?;
        self.sign_node(xml, target)
    }

    fn sign_node(&self, xml: &str, target: Node<'_, '_>) -> SamlResult<String> {
        let id = target
            .attribute("ID")
            .ok_or_else(|| SamlError::Internal("cannot sign an element without ID".to_string()))?;
        let engine = base64::engine::general_purpose::STANDARD;

        let digest_algorithm = self.digest.unwrap_or_else(|| self.algorithm.hash_algorithm());
        let canonical = canonicalize(target, C14nMethod::Exclusive, None, &[]);
        let digest_value = engine.encode(digest(digest_algorithm, canonical.as_bytes()));

        let signed_info = self.signed_info(id, digest_algorithm, &digest_value)?;
        let signed_info_doc = parse_document(&signed_info)?;
        let canonical_signed_info =
            canonicalize(signed_info_doc.root_element(), C14nMethod::Exclusive, None, &[]);
        let signature_value =
            engine.encode(sign(self.algorithm, &self.key, canonical_signed_info.as_bytes())?);

        let mut writer = XmlWriter::new();
        writer.start("ds:Signature", &[("xmlns:ds", XMLDSIG_NS)])?;
        writer.raw(&canonical_signed_info)?;
        writer.text_element("ds:SignatureValue", &[], &signature_value)?;
        if let Some(certificate) = &self.certificate {
            writer.start("ds:KeyInfo", &[])?;
            writer.start("ds:X509Data", &[])?;
            writer.text_element("ds:X509Certificate", &[], &certificate.to_base64())?;
            writer.end("ds:X509Data")?;
            writer.end("ds:KeyInfo")?;
        }
        writer.end("ds:Signature")?;
        let signature = writer.finish()?;

        let position = match child(target, SAML_NS, "Issuer") {
            Some(issuer) => issuer.range().end,
            None => target
                .first_child()
                .map(|n| n.range().start)
                .ok_or_else(|| SamlError::Internal("cannot sign an empty element".to_string()))?,
        };

        let mut out = String::with_capacity(xml.len() + signature.len());
        out.push_str(&xml[..position]);
        out.push_str(&signature);
        out.push_str(&xml[position..]);
        Ok(out)
    }

    fn signed_info(
        &self,
        id: &str,
        digest_algorithm: HashAlgorithm,
        digest_value: &str,
    ) -> SamlResult<String> {
        let reference = format!("#{id}");
        let mut writer = XmlWriter::new();
        writer.start("ds:SignedInfo", &[("xmlns:ds", XMLDSIG_NS)])?;
        writer.empty(
            "ds:CanonicalizationMethod",
            &[("Algorithm", C14nMethod::Exclusive.uri())],
        )?;
        writer.empty("ds:SignatureMethod", &[("Algorithm", self.algorithm.uri())])?;
        writer.start("ds:Reference", &[("URI", reference.as_str())])?;
        writer.start("ds:Transforms", &[])?;
        writer.empty("ds:Transform", &[("Algorithm", ENVELOPED_SIGNATURE)])?;
        writer.empty("ds:Transform", &[("Algorithm", C14nMethod::Exclusive.uri())])?;
        writer.end("ds:Transforms")?;
        writer.empty("ds:DigestMethod", &[("Algorithm", digest_algorithm.digest_uri())])?;
        writer.text_element("ds:DigestValue", &[], digest_value)?;
        writer.end("ds:Reference")?;
        writer.end("ds:SignedInfo")?;
        writer.finish()
    }
}
