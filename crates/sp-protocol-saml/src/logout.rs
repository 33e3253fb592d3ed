//! Single logout validation.
//!
//! Logout messages arrive either on the redirect binding, signed on the
//! query string, or on the POST binding with an enveloped signature.
//! IdP-initiated `LogoutRequest`s yield the profile of the user being
//! logged out; `LogoutResponse`s answer a request this SP sent and retire
//! its ID.

use std::collections::BTreeMap;

use roxmltree::Node;
use tracing::{debug, info, warn};

use crate::bindings::{decode_lenient, decode_post, signed_query, verify_query_signature, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::response::{read_name_id, ResponseValidator};
use crate::signature::verify_node_signature;
use crate::types::{status_codes, Profile, ValidationOutcome, SAMLP_NS, SAML_NS, XMLENC_NS};
use crate::xml::{child, child_text, children, is_element, parse_document, source_text};
use crate::xmlenc::decrypt_element;

impl ResponseValidator<'_> {
    /// Validates a logout message received on the redirect binding.
    ///
    /// `params` are the decoded query parameters and only select the
    /// message type; `original_query` is the raw query string. The message,
    /// `SigAlg` and `Signature` are all taken from it, so what gets
    /// processed is exactly what the IdP signed. Unsigned messages are
    /// rejected.
    ///
    /// ## Errors
    ///
    /// Any [`SamlError`] describing why the message was rejected.
    pub async fn validate_redirect(
        &self,
        params: &BTreeMap<String, String>,
        original_query: &str,
    ) -> SamlResult<ValidationOutcome> {
        let result = self.verify_redirect(params, original_query).await;
        if let Err(err) = &result {
            warn!(kind = err.kind(), error = %err, "redirect logout message rejected");
        }
        result
    }

    async fn verify_redirect(
        &self,
        params: &BTreeMap<String, String>,
        original_query: &str,
    ) -> SamlResult<ValidationOutcome> {
        let message_type = if params.contains_key("SAMLRequest") {
            SamlMessageType::Request
        } else if params.contains_key("SAMLResponse") {
            SamlMessageType::Response
        } else {
            return Err(SamlError::MalformedMessage(
                "Missing SAMLRequest or SAMLResponse".to_string(),
            ));
        };

        let query = signed_query(original_query, message_type)?;
        verify_query_signature(&query.signed, &query.sig_alg, &query.signature, self.certificates)?;

        let xml = decode_lenient(&query.message)?;
        let doc = parse_document(&xml)?;
        let root = doc.root_element();
        match message_type {
            SamlMessageType::Response => self.verify_logout_response(root).await,
            SamlMessageType::Request => self.verify_logout_request(root).await,
        }
    }

    /// Validates an IdP-initiated `LogoutRequest` posted as `SAMLRequest`.
    ///
    /// ## Errors
    ///
    /// Fails unless the document element carries a valid signature and is
    /// a well-formed `LogoutRequest`.
    pub async fn validate_post_request(&self, encoded: &str) -> SamlResult<ValidationOutcome> {
        let xml = decode_post(encoded)?;
        let doc = parse_document(&xml)?;
        let root = doc.root_element();

        if !verify_node_signature(root, self.certificates)? {
            warn!("posted logout request has no valid signature");
            return Err(SamlError::InvalidSignature(
                "Invalid signature on documentElement".to_string(),
            ));
        }
        self.verify_logout_request(root).await
    }

    /// Validates a logout message received on the POST binding, either a
    /// `SAMLRequest` or a `SAMLResponse` form value.
    ///
    /// ## Errors
    ///
    /// Any [`SamlError`] describing why the message was rejected.
    pub async fn validate_logout_post(
        &self,
        params: &BTreeMap<String, String>,
    ) -> SamlResult<ValidationOutcome> {
        if let Some(request) = params.get("SAMLRequest") {
            return self.validate_post_request(request).await;
        }
        let encoded = params.get("SAMLResponse").ok_or_else(|| {
            SamlError::MalformedMessage("Missing SAMLRequest or SAMLResponse".to_string())
        })?;
        let xml = decode_post(encoded)?;
        let doc = parse_document(&xml)?;
        let root = doc.root_element();

        if !verify_node_signature(root, self.certificates)? {
            if let Some(id) = root.attribute("InResponseTo") {
                self.forget(id).await;
            }
            return Err(SamlError::InvalidSignature(
                "Invalid signature on documentElement".to_string(),
            ));
        }
        self.verify_logout_response(root).await
    }

    async fn verify_logout_request(&self, root: Node<'_, '_>) -> SamlResult<ValidationOutcome> {
        if !is_element(root, SAMLP_NS, "LogoutRequest") {
            return Err(shape("Unknown SAML request message"));
        }
        self.verify_issuer(root)?;
        self.check_timestamps(root.attribute("NotBefore"), root.attribute("NotOnOrAfter"), None)?;

        let profile = self.logout_request_profile(root)?;
        info!(
            id = profile.id.as_deref().unwrap_or_default(),
            "identity provider requested logout"
        );
        Ok(ValidationOutcome::LoggedOut(Some(Box::new(profile))))
    }

    async fn verify_logout_response(&self, root: Node<'_, '_>) -> SamlResult<ValidationOutcome> {
        if !is_element(root, SAMLP_NS, "LogoutResponse") {
            return Err(shape("Unknown SAML response message"));
        }
        let in_response_to = root.attribute("InResponseTo");

        let checked = self.check_logout_response(root);
        if let Err(err) = checked {
            if let Some(id) = in_response_to {
                self.forget(id).await;
            }
            return Err(err);
        }
        if self.config.validate_in_response_to {
            self.consume_in_response_to(in_response_to).await?;
        }
        debug!(in_response_to, "logout response accepted");
        Ok(ValidationOutcome::LoggedOut(None))
    }

    fn check_logout_response(&self, root: Node<'_, '_>) -> SamlResult<()> {
        let status = child(root, SAMLP_NS, "Status");
        let code = status
            .and_then(|s| child(s, SAMLP_NS, "StatusCode"))
            .and_then(|c| c.attribute("Value"));
        if code != Some(status_codes::SUCCESS) {
            return Err(SamlError::Status {
                message: format!("Bad status code: {}", code.unwrap_or("missing")),
                status_xml: status.map(source_text).unwrap_or_default().to_string(),
            });
        }
        self.verify_issuer(root)
    }

    /// Checks the message issuer when an IdP issuer is configured.
    fn verify_issuer(&self, root: Node<'_, '_>) -> SamlResult<()> {
        let Some(expected) = self.config.idp_issuer.as_deref() else {
            return Ok(());
        };
        let issuer = child_text(root, SAML_NS, "Issuer")
            .ok_or_else(|| shape("Missing SAML issuer"))?;
        let issuer = issuer.trim();
        if issuer != expected {
            return Err(shape(&format!(
                "Unknown SAML issuer. Expected: {expected} Received: {issuer}"
            )));
        }
        Ok(())
    }

    fn logout_request_profile(&self, root: Node<'_, '_>) -> SamlResult<Profile> {
        let id = root
            .attribute("ID")
            .ok_or_else(|| shape("Missing SAML LogoutRequest ID"))?;
        let issuer = child_text(root, SAML_NS, "Issuer")
            .ok_or_else(|| shape("Missing SAML issuer"))?;

        let name_ids: Vec<_> = children(root, SAML_NS, "NameID").collect();
        let encrypted_ids: Vec<_> = children(root, SAML_NS, "EncryptedID").collect();
        if name_ids.len() + encrypted_ids.len() > 1 {
            return Err(shape("Invalid LogoutRequest"));
        }

        let name_id = if let Some(&encrypted) = encrypted_ids.first() {
            let key = self.decryption_key.ok_or_else(|| {
                SamlError::MissingCredential(
                    "No decryption key found getting name ID for encrypted SAML response"
                        .to_string(),
                )
            })?;
            if children(encrypted, XMLENC_NS, "EncryptedData").count() != 1 {
                return Err(shape("Invalid LogoutRequest"));
            }
            let decrypted = decrypt_element(encrypted, key)?;
            let decrypted_doc = parse_document(&decrypted)?;
            let node = decrypted_doc.root_element();
            if !is_element(node, SAML_NS, "NameID") {
                return Err(shape("Invalid EncryptedAssertion content"));
            }
            read_name_id(node)
        } else if let Some(&node) = name_ids.first() {
            read_name_id(node)
        } else {
            return Err(shape("Missing SAML NameID"));
        };

        Ok(Profile {
            id: Some(id.to_string()),
            issuer: Some(issuer),
            name_id: Some(name_id),
            session_index: child_text(root, SAMLP_NS, "SessionIndex"),
            ..Profile::default()
        })
    }
}

fn shape(message: &str) -> SamlError {
    SamlError::ProtocolShape(message.to_string())
}
