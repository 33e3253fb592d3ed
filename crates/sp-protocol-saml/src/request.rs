//! Outbound message construction.
//!
//! [`RequestBuilder`] renders authentication and logout messages from the
//! configuration, records request IDs for later `InResponseTo` checks and
//! encodes the result for the redirect or POST binding.

use chrono::{DateTime, Utc};
use sp_cache::ReplayCache;
use sp_crypto::generate_request_id;
use tracing::{debug, warn};

use crate::bindings::{
    auto_submit_form, build_redirect_url, encode_message, QuerySigner, SamlMessageType,
};
use crate::config::SamlConfig;
use crate::credentials::Credentials;
use crate::error::SamlResult;
use crate::signature::XmlSigner;
use crate::types::{
    AuthnRequest, LogoutRequest, LogoutResponse, LogoutSubject, NameIdPolicy,
    RequestedAuthnContext,
};

/// Builds outbound SAML messages for one service provider.
pub struct RequestBuilder<'a> {
    config: &'a SamlConfig,
    credentials: &'a Credentials,
    cache: &'a dyn ReplayCache,
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder over `config` and its parsed `credentials`.
    #[must_use]
    pub fn new(
        config: &'a SamlConfig,
        credentials: &'a Credentials,
        cache: &'a dyn ReplayCache,
    ) -> Self {
        Self {
            config,
            credentials,
            cache,
        }
    }

    /// Renders an `AuthnRequest`.
    ///
    /// `passive` is combined with the configured `passive` flag. With
    /// `post` set and signing credentials configured the request carries an
    /// enveloped signature; redirect requests are signed on the query
    /// string instead.
    ///
    /// ## Errors
    ///
    /// Fails when the replay cache is unavailable or signing fails.
    pub async fn authn_request(
        &self,
        passive: bool,
        post: bool,
        host: Option<&str>,
        now: DateTime<Utc>,
    ) -> SamlResult<String> {
        let config = self.config;
        let id = generate_request_id();
        self.remember(&id, now).await?;

        let mut request = AuthnRequest::new(&id, now, &config.entry_point, &config.issuer);
        request.is_passive = passive || config.passive;
        request.force_authn = config.force_authn;
        if !config.disable_request_acs_url {
            request.assertion_consumer_service_url = Some(config.callback_url(host));
        }
        request.name_id_policy = config.identifier_format().map(|format| NameIdPolicy {
            format: format.to_string(),
            allow_create: true,
        });
        if !config.disable_requested_authn_context {
            request.requested_authn_context = Some(RequestedAuthnContext {
                comparison: config.rac_comparison,
                class_refs: config.authn_context.clone(),
            });
        }
        request
            .attribute_consuming_service_index
            .clone_from(&config.attribute_consuming_service_index);
        request.provider_name.clone_from(&config.provider_name);
        request.scoping.clone_from(&config.scoping);

        let xml = request.to_xml()?;
        debug!(id = %id, passive = request.is_passive, post, "built AuthnRequest");

        match self.xml_signer() {
            Some(signer) if post => signer.sign_root(&xml),
            _ => Ok(xml),
        }
    }

    /// Renders a `LogoutRequest` for `subject`.
    ///
    /// ## Errors
    ///
    /// Fails when the replay cache is unavailable.
    pub async fn logout_request(
        &self,
        subject: &LogoutSubject,
        now: DateTime<Utc>,
    ) -> SamlResult<String> {
        let id = generate_request_id();
        self.remember(&id, now).await?;

        let request = LogoutRequest::new(
            &id,
            now,
            self.config.logout_url(),
            &self.config.issuer,
            subject.clone(),
        );
        debug!(id = %id, "built LogoutRequest");
        request.to_xml()
    }

    /// Renders a successful `LogoutResponse` to the IdP request `request_id`.
    pub fn logout_response(&self, request_id: &str, now: DateTime<Utc>) -> SamlResult<String> {
        let response = LogoutResponse::success(
            generate_request_id(),
            now,
            self.config.logout_url(),
            &self.config.issuer,
            request_id,
        );
        response.to_xml()
    }

    /// Encodes `xml` onto `target` as a redirect-binding URL, signing the
    /// query when a signing key is configured.
    ///
    /// ## Errors
    ///
    /// Fails when `target` is not a URL or signing fails.
    pub fn redirect_url(
        &self,
        target: &str,
        message_type: SamlMessageType,
        xml: &str,
        params: &[(String, String)],
    ) -> SamlResult<String> {
        let encoded = encode_message(xml, !self.config.skip_request_compression)?;
        let signer = self.credentials.signing_key.as_ref().map(|key| QuerySigner {
            key,
            algorithm: self.config.signature_algorithm,
        });
        build_redirect_url(target, message_type, &encoded, params, signer)
    }

    /// Renders an auto-submitting form posting `xml` to `target`.
    pub fn post_form(
        &self,
        target: &str,
        message_type: SamlMessageType,
        xml: &str,
        params: &[(String, String)],
    ) -> SamlResult<String> {
        let encoded = encode_message(xml, !self.config.skip_request_compression)?;
        let mut fields = vec![(message_type.param().to_string(), encoded)];
        fields.extend(params.iter().cloned());
        Ok(auto_submit_form(target, &fields))
    }

    fn xml_signer(&self) -> Option<XmlSigner> {
        let key = self.credentials.signing_key.clone()?;
        let cert = self.credentials.signing_cert.clone()?;
        Some(
            XmlSigner::new(key, Some(cert))
                .with_algorithm(self.config.signature_algorithm)
                .with_digest(self.config.digest_algorithm),
        )
    }

    async fn remember(&self, id: &str, now: DateTime<Utc>) -> SamlResult<()> {
        if !self.config.validate_in_response_to {
            return Ok(());
        }
        if !self.cache.save(id, now).await? {
            warn!(id, "request ID already tracked");
        }
        Ok(())
    }
}
