//! The service provider: configuration, credentials and replay cache
//! bound together behind the operations an application calls.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sp_cache::{InMemoryReplayCache, ReplayCache};
use sp_crypto::Certificate;
use tracing::{info, instrument};

use crate::bindings::{merge_params, SamlMessageType};
use crate::config::SamlConfig;
use crate::credentials::{CertificateProvider, Credentials};
use crate::error::SamlResult;
use crate::metadata;
use crate::request::RequestBuilder;
use crate::response::ResponseValidator;
use crate::types::{LogoutSubject, ValidationOutcome};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A configured SAML service provider.
///
/// Cheap to clone; clones share the replay cache.
#[derive(Clone)]
pub struct ServiceProvider {
    config: Arc<SamlConfig>,
    credentials: Arc<Credentials>,
    cache: Arc<dyn ReplayCache>,
    certificate_provider: Option<Arc<dyn CertificateProvider>>,
    clock: Clock,
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("issuer", &self.config.issuer)
            .field("entry_point", &self.config.entry_point)
            .field("certificate_provider", &self.certificate_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceProvider {
    /// Validates `config`, parses its key material and sets up an
    /// in-memory replay cache whose TTL is the request ID expiration period.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::SamlError::Configuration`] for an invalid
    /// configuration or unparseable key material.
    pub fn new(config: SamlConfig) -> SamlResult<Self> {
        config.validate()?;
        let credentials = Credentials::from_config(&config)?;
        let ttl = Duration::from_millis(config.request_id_expiration_period_ms);
        info!(
            issuer = %config.issuer,
            idp_certs = credentials.idp_certs.len(),
            signing = credentials.signing_key.is_some(),
            decryption = credentials.decryption_key.is_some(),
            "service provider configured"
        );
        Ok(Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            cache: Arc::new(InMemoryReplayCache::new(ttl)),
            certificate_provider: None,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replaces the replay cache, e.g. with a shared Redis-backed one.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ReplayCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Resolves IdP certificates through `provider` instead of the
    /// configured list.
    #[must_use]
    pub fn with_certificate_provider(mut self, provider: Arc<dyn CertificateProvider>) -> Self {
        self.certificate_provider = Some(provider);
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SamlConfig {
        &self.config
    }

    /// The assertion consumer URL, derived from `host` when no explicit
    /// callback URL is configured.
    #[must_use]
    pub fn callback_url(&self, host: Option<&str>) -> String {
        self.config.callback_url(host)
    }

    /// Renders an `AuthnRequest`.
    ///
    /// ## Errors
    ///
    /// Fails when the replay cache is unavailable or signing fails.
    pub async fn authn_request_xml(
        &self,
        passive: bool,
        post: bool,
        host: Option<&str>,
    ) -> SamlResult<String> {
        self.requests().authn_request(passive, post, host, self.now()).await
    }

    /// Renders a `LogoutRequest` for `subject`.
    ///
    /// ## Errors
    ///
    /// Fails when the replay cache is unavailable.
    pub async fn logout_request_xml(&self, subject: &LogoutSubject) -> SamlResult<String> {
        self.requests().logout_request(subject, self.now()).await
    }

    /// Renders a successful `LogoutResponse` to `request_id`.
    ///
    /// ## Errors
    ///
    /// Fails when the XML cannot be written.
    pub fn logout_response_xml(&self, request_id: &str) -> SamlResult<String> {
        self.requests().logout_response(request_id, self.now())
    }

    /// Redirect URL sending an `AuthnRequest` to the IdP entry point.
    ///
    /// ## Errors
    ///
    /// Fails when the request cannot be built or signed.
    #[instrument(skip(self, params), fields(issuer = %self.config.issuer))]
    pub async fn authorize_url(
        &self,
        relay_state: Option<&str>,
        host: Option<&str>,
        params: &BTreeMap<String, String>,
    ) -> SamlResult<String> {
        let xml = self.authn_request_xml(false, false, host).await?;
        let params = merge_params(
            relay_state,
            &[
                &self.config.additional_params,
                &self.config.additional_authorize_params,
                params,
            ],
        );
        self.requests().redirect_url(
            &self.config.entry_point,
            SamlMessageType::Request,
            &xml,
            &params,
        )
    }

    /// Auto-submitting HTML form posting a signed `AuthnRequest` to the IdP
    /// entry point.
    ///
    /// ## Errors
    ///
    /// Fails when the request cannot be built or signed.
    #[instrument(skip(self), fields(issuer = %self.config.issuer))]
    pub async fn authorize_form(
        &self,
        relay_state: Option<&str>,
        host: Option<&str>,
    ) -> SamlResult<String> {
        let xml = self.authn_request_xml(self.config.passive, true, host).await?;
        let params = merge_params(
            relay_state,
            &[&self.config.additional_params, &self.config.additional_authorize_params],
        );
        self.requests().post_form(
            &self.config.entry_point,
            SamlMessageType::Request,
            &xml,
            &params,
        )
    }

    /// Redirect URL sending a `LogoutRequest` for `subject` to the IdP.
    ///
    /// ## Errors
    ///
    /// Fails when the request cannot be built or signed.
    pub async fn logout_url(
        &self,
        subject: &LogoutSubject,
        relay_state: Option<&str>,
        params: &BTreeMap<String, String>,
    ) -> SamlResult<String> {
        let xml = self.logout_request_xml(subject).await?;
        self.requests().redirect_url(
            self.config.logout_url(),
            SamlMessageType::Request,
            &xml,
            &self.logout_params(relay_state, params),
        )
    }

    /// Redirect URL answering the IdP logout request `request_id`.
    ///
    /// ## Errors
    ///
    /// Fails when the response cannot be built or signed.
    pub fn logout_response_url(
        &self,
        request_id: &str,
        relay_state: Option<&str>,
        params: &BTreeMap<String, String>,
    ) -> SamlResult<String> {
        let xml = self.logout_response_xml(request_id)?;
        self.requests().redirect_url(
            self.config.logout_url(),
            SamlMessageType::Response,
            &xml,
            &self.logout_params(relay_state, params),
        )
    }

    /// Validates a POSTed `SAMLResponse`.
    ///
    /// ## Errors
    ///
    /// Any [`crate::SamlError`] describing why the response was rejected.
    pub async fn validate_post_response(&self, encoded: &str) -> SamlResult<ValidationOutcome> {
        let certificates = self.certificates().await?;
        self.validator(&certificates).validate_post_response(encoded).await
    }

    /// Validates a POSTed IdP-initiated `LogoutRequest`.
    ///
    /// ## Errors
    ///
    /// Any [`crate::SamlError`] describing why the request was rejected.
    pub async fn validate_post_request(&self, encoded: &str) -> SamlResult<ValidationOutcome> {
        let certificates = self.certificates().await?;
        self.validator(&certificates).validate_post_request(encoded).await
    }

    /// Validates a logout message received on the redirect binding.
    ///
    /// ## Errors
    ///
    /// Any [`crate::SamlError`] describing why the message was rejected.
    pub async fn validate_redirect(
        &self,
        params: &BTreeMap<String, String>,
        original_query: &str,
    ) -> SamlResult<ValidationOutcome> {
        let certificates = self.certificates().await?;
        self.validator(&certificates)
            .validate_redirect(params, original_query)
            .await
    }

    /// Validates a logout message received on the POST binding.
    ///
    /// ## Errors
    ///
    /// Any [`crate::SamlError`] describing why the message was rejected.
    pub async fn validate_logout_post(
        &self,
        params: &BTreeMap<String, String>,
    ) -> SamlResult<ValidationOutcome> {
        let certificates = self.certificates().await?;
        self.validator(&certificates).validate_logout_post(params).await
    }

    /// SP metadata. Certificates default to the configured ones.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::SamlError::MissingCredential`] when a key is
    /// configured without its certificate.
    pub fn metadata(
        &self,
        decryption_cert: Option<&str>,
        signing_cert: Option<&str>,
    ) -> SamlResult<String> {
        metadata::generate(&self.config, decryption_cert, signing_cert)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn requests(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.config, &self.credentials, self.cache.as_ref())
    }

    fn validator<'a>(&'a self, certificates: &'a [Certificate]) -> ResponseValidator<'a> {
        ResponseValidator::new(
            &self.config,
            certificates,
            self.credentials.decryption_key.as_ref(),
            self.cache.as_ref(),
            self.now(),
        )
    }

    async fn certificates(&self) -> SamlResult<Vec<Certificate>> {
        match &self.certificate_provider {
            Some(provider) => provider.certificates().await,
            None => Ok(self.credentials.idp_certs.clone()),
        }
    }

    fn logout_params(
        &self,
        relay_state: Option<&str>,
        params: &BTreeMap<String, String>,
    ) -> Vec<(String, String)> {
        merge_params(
            relay_state,
            &[&self.config.additional_params, &self.config.additional_logout_params, params],
        )
    }
}
