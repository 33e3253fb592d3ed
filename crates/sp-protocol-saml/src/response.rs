//! Validation of IdP responses posted to the assertion consumer service.
//!
//! A profile is only produced from an assertion whose content is covered
//! by a verified signature, either the response's own or the
//! assertion's. See [`crate::signature`] for what "covered" means.
//!
//! The same [`ResponseValidator`] also checks logout messages; those
//! flows live in [`crate::logout`].

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use roxmltree::Node;
use sp_cache::ReplayCache;
use sp_crypto::{Certificate, PrivateKey};
use tracing::{debug, info, warn};

use crate::bindings::decode_post;
use crate::config::SamlConfig;
use crate::error::{SamlError, SamlResult};
use crate::signature::verify_node_signature;
use crate::types::{
    status_codes, AttributeValue, NameId, Profile, ValidationOutcome, MAIL_OID, SAMLP_NS, SAML_NS,
};
use crate::xml::{child, child_text, children, is_element, parse_document, source_text, text_content};
use crate::xmlenc::decrypt_element;

/// Validates inbound messages for one service provider at one instant.
pub struct ResponseValidator<'a> {
    pub(crate) config: &'a SamlConfig,
    pub(crate) certificates: &'a [Certificate],
    pub(crate) decryption_key: Option<&'a PrivateKey>,
    pub(crate) cache: &'a dyn ReplayCache,
    pub(crate) now: DateTime<Utc>,
}

impl<'a> ResponseValidator<'a> {
    /// Creates a validator. `certificates` are the IdP certificates any
    /// signature may verify against.
    #[must_use]
    pub fn new(
        config: &'a SamlConfig,
        certificates: &'a [Certificate],
        decryption_key: Option<&'a PrivateKey>,
        cache: &'a dyn ReplayCache,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            certificates,
            decryption_key,
            cache,
            now,
        }
    }

    /// Validates a base64 `SAMLResponse` form value.
    ///
    /// On failure the tracked request the response answers, if any, is
    /// forgotten so it cannot be answered again.
    ///
    /// ## Errors
    ///
    /// Any [`SamlError`] describing why the response was rejected.
    pub async fn validate_post_response(&self, encoded: &str) -> SamlResult<ValidationOutcome> {
        let xml = decode_post(encoded)?;
        let doc = parse_document(&xml)?;
        let root = doc.root_element();
        let in_response_to = is_element(root, SAMLP_NS, "Response")
            .then(|| root.attribute("InResponseTo"))
            .flatten();

        let result = self.validate_response(root, &xml, in_response_to).await;
        if let Err(err) = &result {
            warn!(kind = err.kind(), error = %err, "SAML response rejected");
            if let Some(id) = in_response_to {
                self.forget(id).await;
            }
        }
        result
    }

    async fn validate_response(
        &self,
        root: Node<'_, '_>,
        xml: &str,
        in_response_to: Option<&str>,
    ) -> SamlResult<ValidationOutcome> {
        let is_response = is_element(root, SAMLP_NS, "Response");
        if is_response && self.config.validate_in_response_to {
            let id = in_response_to
                .ok_or_else(|| replay("InResponseTo is missing from response"))?;
            if self.cache.get(id).await?.is_none() {
                return Err(replay("InResponseTo is not valid"));
            }
        }

        let valid_signature = verify_node_signature(root, self.certificates)?;

        if !is_response {
            if !valid_signature {
                return Err(invalid_signature("Invalid signature: No response found"));
            }
            if is_element(root, SAMLP_NS, "LogoutResponse") {
                return Ok(ValidationOutcome::LoggedOut(None));
            }
            return Err(shape("Unknown SAML response message"));
        }

        let assertions: Vec<_> = children(root, SAML_NS, "Assertion").collect();
        let encrypted: Vec<_> = children(root, SAML_NS, "EncryptedAssertion").collect();
        if assertions.len() + encrypted.len() > 1 {
            return Err(invalid_signature("Invalid signature: multiple assertions"));
        }
        let needs_assertion_signature = self.config.want_assertions_signed || !valid_signature;

        if let Some(&assertion) = assertions.first() {
            if needs_assertion_signature && !verify_node_signature(assertion, self.certificates)? {
                return Err(invalid_signature("Invalid signature"));
            }
            let profile = self
                .process_assertion(assertion, source_text(assertion), xml, in_response_to)
                .await?;
            return Ok(ValidationOutcome::SignedIn(Box::new(profile)));
        }

        if let Some(&encrypted) = encrypted.first() {
            let key = self.decryption_key.ok_or_else(|| {
                SamlError::MissingCredential(
                    "No decryption key for encrypted SAML response".to_string(),
                )
            })?;
            let decrypted = decrypt_element(encrypted, key)?;
            let decrypted_doc = parse_document(&decrypted)?;
            let assertion = decrypted_doc.root_element();
            if !is_element(assertion, SAML_NS, "Assertion") {
                return Err(shape("Invalid EncryptedAssertion content"));
            }

            let verified = if self.config.validate_decrypted_assertion_signature {
                !needs_assertion_signature
                    || verify_node_signature(assertion, self.certificates)?
            } else {
                valid_signature
            };
            if !verified {
                return Err(invalid_signature("Invalid signature from encrypted assertion"));
            }
            let profile = self
                .process_assertion(assertion, &decrypted, xml, in_response_to)
                .await?;
            return Ok(ValidationOutcome::SignedIn(Box::new(profile)));
        }

        self.inspect_status(root, valid_signature, in_response_to).await
    }

    async fn inspect_status(
        &self,
        root: Node<'_, '_>,
        valid_signature: bool,
        in_response_to: Option<&str>,
    ) -> SamlResult<ValidationOutcome> {
        let Some(status) = child(root, SAMLP_NS, "Status") else {
            return Err(shape("Missing SAML assertion"));
        };
        let code = child(status, SAMLP_NS, "StatusCode");
        let value = code.and_then(|c| c.attribute("Value"));
        let Some(value) = value.filter(|v| *v != status_codes::SUCCESS) else {
            return Err(shape("Missing SAML assertion"));
        };
        let nested = code
            .and_then(|c| child(c, SAMLP_NS, "StatusCode"))
            .and_then(|c| c.attribute("Value"));

        if value == status_codes::RESPONDER && nested == Some(status_codes::NO_PASSIVE) {
            if !valid_signature {
                return Err(invalid_signature("Invalid signature: NoPassive"));
            }
            if let Some(id) = in_response_to {
                self.forget(id).await;
            }
            info!("identity provider refused passive authentication");
            return Ok(ValidationOutcome::NoPassive);
        }

        let message = child_text(status, SAMLP_NS, "StatusMessage")
            .filter(|m| !m.trim().is_empty())
            .or_else(|| nested.map(|n| status_codes::suffix(n).to_string()))
            .unwrap_or_else(|| "unspecified".to_string());
        Err(SamlError::Status {
            message: format!(
                "SAML provider returned {} error: {message}",
                status_codes::suffix(value)
            ),
            status_xml: source_text(status).to_string(),
        })
    }

    async fn process_assertion(
        &self,
        assertion: Node<'_, '_>,
        assertion_xml: &str,
        response_xml: &str,
        in_response_to: Option<&str>,
    ) -> SamlResult<Profile> {
        let mut profile = Profile {
            issuer: child_text(assertion, SAML_NS, "Issuer"),
            in_response_to: in_response_to.map(str::to_string),
            session_index: child(assertion, SAML_NS, "AuthnStatement")
                .and_then(|s| s.attribute("SessionIndex"))
                .map(str::to_string),
            assertion_xml: Some(assertion_xml.to_string()),
            response_xml: Some(response_xml.to_string()),
            ..Profile::default()
        };
        let issue_instant = assertion.attribute("IssueInstant");

        let subject = child(assertion, SAML_NS, "Subject");
        profile.name_id = subject
            .and_then(|s| child(s, SAML_NS, "NameID"))
            .map(read_name_id);

        let confirmations: Vec<_> = subject
            .map(|s| children(s, SAML_NS, "SubjectConfirmation").collect())
            .unwrap_or_default();
        if confirmations.len() > 1 {
            return Err(shape(
                "Unable to process multiple SubjectConfirmations in SAML assertion",
            ));
        }
        let confirmation_data = confirmations
            .first()
            .and_then(|c| child(*c, SAML_NS, "SubjectConfirmationData"));

        if self.config.validate_in_response_to {
            let subject_irt = confirmation_data.and_then(|d| d.attribute("InResponseTo"));
            if subject_irt.is_some() && subject_irt != in_response_to {
                if let Some(id) = in_response_to {
                    self.forget(id).await;
                }
                return Err(replay("InResponseTo is not valid"));
            }
            self.consume_in_response_to(in_response_to).await?;
        }

        if let Some(data) = confirmation_data {
            let not_on_or_after = data.attribute("NotOnOrAfter");
            let max_time = self.max_time(not_on_or_after, issue_instant)?;
            self.check_timestamps(data.attribute("NotBefore"), not_on_or_after, max_time)?;
        }

        let conditions: Vec<_> = children(assertion, SAML_NS, "Conditions").collect();
        if conditions.len() > 1 {
            return Err(shape("Unable to process multiple conditions in SAML assertion"));
        }
        if let Some(conditions) = conditions.first() {
            let not_on_or_after = conditions.attribute("NotOnOrAfter");
            let max_time = self.max_time(not_on_or_after, issue_instant)?;
            self.check_timestamps(conditions.attribute("NotBefore"), not_on_or_after, max_time)?;
        }
        if let Some(audience) = self.config.audience() {
            check_audience(conditions.first().copied(), audience)?;
        }

        for statement in children(assertion, SAML_NS, "AttributeStatement") {
            for attribute in children(statement, SAML_NS, "Attribute") {
                let Some(name) = attribute.attribute("Name") else {
                    continue;
                };
                let values = children(attribute, SAML_NS, "AttributeValue")
                    .map(attribute_value_text)
                    .collect();
                if let Some(value) = AttributeValue::from_values(values) {
                    profile.attributes.insert(name.to_string(), value);
                }
            }
        }

        let first = |key: &str| {
            profile
                .attributes
                .get(key)
                .and_then(AttributeValue::first)
                .map(str::to_string)
        };
        profile.mail = first("mail").or_else(|| first(MAIL_OID));
        profile.email = first("email").or_else(|| profile.mail.clone());

        debug!(
            issuer = profile.issuer.as_deref().unwrap_or_default(),
            attributes = profile.attributes.len(),
            "assertion accepted"
        );
        Ok(profile)
    }

    /// Retires a tracked request ID. Succeeds only when the entry was live
    /// and has not outlived the request ID expiration period.
    pub(crate) async fn consume_in_response_to(&self, in_response_to: Option<&str>) -> SamlResult<()> {
        if !self.config.validate_in_response_to {
            return Ok(());
        }
        let id = in_response_to.ok_or_else(|| replay("InResponseTo is missing from response"))?;
        let issued_at = self.cache.remove(id).await?;
        debug!(id, live = issued_at.is_some(), "request ID consumed");

        let period = i64::try_from(self.config.request_id_expiration_period_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        match issued_at {
            Some(issued_at)
                if issued_at
                    .checked_add_signed(period)
                    .map_or(true, |expires| self.now < expires) =>
            {
                Ok(())
            }
            _ => Err(replay("InResponseTo is not valid")),
        }
    }

    /// Best-effort removal of a tracked request ID.
    pub(crate) async fn forget(&self, id: &str) {
        if !self.config.validate_in_response_to {
            return;
        }
        if let Err(err) = self.cache.remove(id).await {
            warn!(id, error = %err, "could not remove request ID");
        }
    }

    /// Checks a validity window against the current time, widened by the
    /// accepted clock skew.
    pub(crate) fn check_timestamps(
        &self,
        not_before: Option<&str>,
        not_on_or_after: Option<&str>,
        max_time: Option<DateTime<Utc>>,
    ) -> SamlResult<()> {
        let skew = self.config.accepted_clock_skew_ms;
        if skew == -1 {
            return Ok(());
        }
        let skew = TimeDelta::try_milliseconds(skew).unwrap_or(TimeDelta::MAX);
        let latest = self.now.checked_add_signed(skew).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let earliest = self.now.checked_sub_signed(skew).unwrap_or(DateTime::<Utc>::MIN_UTC);

        if let Some(not_before) = not_before {
            if latest < parse_instant("NotBefore", not_before)? {
                return Err(temporal("SAML assertion not yet valid"));
            }
        }
        if let Some(not_on_or_after) = not_on_or_after {
            if earliest >= parse_instant("NotOnOrAfter", not_on_or_after)? {
                return Err(temporal("SAML assertion expired: clocks skewed too much"));
            }
        }
        if let Some(max_time) = max_time {
            if earliest >= max_time {
                return Err(temporal("SAML assertion expired: assertion too old"));
            }
        }
        Ok(())
    }

    /// Expiry imposed by the maximum assertion age: the earlier of
    /// `NotOnOrAfter` and `IssueInstant + max age`.
    fn max_time(
        &self,
        not_on_or_after: Option<&str>,
        issue_instant: Option<&str>,
    ) -> SamlResult<Option<DateTime<Utc>>> {
        let max_age = self.config.max_assertion_age_ms;
        let Some(issue_instant) = issue_instant.filter(|_| max_age > 0) else {
            return Ok(None);
        };
        let issued = parse_instant("IssueInstant", issue_instant)?;
        let limit = TimeDelta::try_milliseconds(max_age)
            .and_then(|age| issued.checked_add_signed(age))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let not_on_or_after = not_on_or_after
            .map(|v| parse_instant("NotOnOrAfter", v))
            .transpose()?;
        Ok(Some(match not_on_or_after {
            Some(end) if end < limit => end,
            _ => limit,
        }))
    }
}

/// Reads a `NameID`. Qualifiers are only read alongside a `Format`.
pub(crate) fn read_name_id(node: Node<'_, '_>) -> NameId {
    let name_id = NameId::new(text_content(node));
    match node.attribute("Format") {
        Some(format) => name_id.with_format(format).with_qualifiers(
            node.attribute("NameQualifier").map(str::to_string),
            node.attribute("SPNameQualifier").map(str::to_string),
        ),
        None => name_id,
    }
}

/// Parses an `xs:dateTime`; values without a zone are taken as UTC.
pub(crate) fn parse_instant(label: &str, value: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
        })
        .map_err(|_| {
            SamlError::MalformedMessage(format!(
                "Error parsing {label}: '{value}' is not a valid date"
            ))
        })
}

fn check_audience(conditions: Option<Node<'_, '_>>, expected: &str) -> SamlResult<()> {
    let restrictions: Vec<_> = conditions
        .map(|c| children(c, SAML_NS, "AudienceRestriction").collect())
        .unwrap_or_default();
    if restrictions.is_empty() {
        return Err(audience("SAML assertion has no AudienceRestriction"));
    }
    for restriction in restrictions {
        let audiences: Vec<String> = children(restriction, SAML_NS, "Audience")
            .map(text_content)
            .collect();
        if audiences.is_empty() {
            return Err(audience("SAML assertion AudienceRestriction has no Audience value"));
        }
        if !audiences.iter().any(|a| a.trim() == expected) {
            debug!(expected, ?audiences, "audience mismatch");
            return Err(audience("SAML assertion audience mismatch"));
        }
    }
    Ok(())
}

/// Text of an `AttributeValue`; complex values keep their inner markup.
fn attribute_value_text(value: Node<'_, '_>) -> String {
    if !value.children().any(|n| n.is_element()) {
        return text_content(value);
    }
    match (value.first_child(), value.last_child()) {
        (Some(first), Some(last)) => {
            value.document().input_text()[first.range().start..last.range().end].to_string()
        }
        _ => String::new(),
    }
}

fn replay(message: &str) -> SamlError {
    SamlError::Replay(message.to_string())
}

fn invalid_signature(message: &str) -> SamlError {
    SamlError::InvalidSignature(message.to_string())
}

fn shape(message: &str) -> SamlError {
    SamlError::ProtocolShape(message.to_string())
}

fn temporal(message: &str) -> SamlError {
    SamlError::Temporal(message.to_string())
}

fn audience(message: &str) -> SamlError {
    SamlError::Audience(message.to_string())
}
