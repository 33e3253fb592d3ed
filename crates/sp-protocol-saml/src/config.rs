//! Service provider configuration.
//!
//! [`SamlConfig`] is plain data: it deserializes from TOML (every optional
//! field has a default) and can be assembled in code with the `with_*`
//! builders. Key material is kept as text here and parsed once by
//! [`Credentials`](crate::credentials::Credentials).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use sp_crypto::{HashAlgorithm, SignatureAlgorithm};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    AuthnContextClass, AuthnContextComparison, NameIdFormat, SamlBinding, Scoping,
};

/// Configuration of a SAML service provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamlConfig {
    /// IdP single sign-on URL.
    #[serde(default)]
    pub entry_point: String,

    /// Entity ID of this service provider.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// IdP signing certificates, PEM or bare base64. Any of them may sign.
    #[serde(default, deserialize_with = "one_or_many")]
    pub idp_cert: Vec<String>,

    /// Assertion consumer URL. Derived from `protocol`, `host` and `path`
    /// when unset.
    #[serde(default)]
    pub callback_url: Option<String>,

    /// Host used to derive the callback URL.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path used to derive the callback URL.
    #[serde(default = "default_path")]
    pub path: String,

    /// Scheme used to derive the callback URL, e.g. `https:`.
    #[serde(default)]
    pub protocol: Option<String>,

    /// IdP single logout URL; the entry point when unset.
    #[serde(default)]
    pub logout_url: Option<String>,

    /// Where the IdP sends logout messages; advertised in metadata.
    #[serde(default)]
    pub logout_callback_url: Option<String>,

    /// Requested name ID format. An empty string disables the policy.
    #[serde(default = "default_identifier_format")]
    pub identifier_format: Option<String>,

    /// Expected issuer of IdP logout messages.
    #[serde(default)]
    pub idp_issuer: Option<String>,

    /// Expected assertion audience; the issuer when unset.
    #[serde(default)]
    pub audience: Option<String>,

    /// Accepts assertions regardless of their audience restriction.
    #[serde(default)]
    pub skip_audience_check: bool,

    /// SP signing key.
    #[serde(default)]
    pub private_key: Option<String>,

    /// Certificate matching `private_key`.
    #[serde(default)]
    pub signing_cert: Option<String>,

    /// Key for encrypted assertions and name IDs.
    #[serde(default)]
    pub decryption_pvk: Option<String>,

    /// Certificate matching `decryption_pvk`.
    #[serde(default)]
    pub decryption_cert: Option<String>,

    /// Signature algorithm for outbound messages.
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,

    /// Digest for enveloped signatures; follows the signature algorithm
    /// when unset.
    #[serde(default)]
    pub digest_algorithm: Option<HashAlgorithm>,

    /// Binding used to send authentication requests.
    #[serde(default)]
    pub authn_request_binding: SamlBinding,

    /// Requested authentication context classes.
    #[serde(default = "default_authn_context")]
    pub authn_context: Vec<String>,

    /// Comparison applied to `authn_context`.
    #[serde(default)]
    pub rac_comparison: AuthnContextComparison,

    /// Omits `RequestedAuthnContext`.
    #[serde(default)]
    pub disable_requested_authn_context: bool,

    /// Omits `AssertionConsumerServiceURL`.
    #[serde(default)]
    pub disable_request_acs_url: bool,

    /// Requests `ForceAuthn`.
    #[serde(default)]
    pub force_authn: bool,

    /// Requests passive authentication on every request.
    #[serde(default)]
    pub passive: bool,

    /// Sends redirect-binding messages without DEFLATE.
    #[serde(default)]
    pub skip_request_compression: bool,

    /// `AttributeConsumingServiceIndex` of authentication requests.
    #[serde(default)]
    pub attribute_consuming_service_index: Option<String>,

    /// `ProviderName` of authentication requests.
    #[serde(default)]
    pub provider_name: Option<String>,

    /// IdP proxying constraints.
    #[serde(default)]
    pub scoping: Option<Scoping>,

    /// Parameters added to every outbound redirect or form.
    #[serde(default)]
    pub additional_params: BTreeMap<String, String>,

    /// Parameters added to authentication requests.
    #[serde(default)]
    pub additional_authorize_params: BTreeMap<String, String>,

    /// Parameters added to logout messages.
    #[serde(default)]
    pub additional_logout_params: BTreeMap<String, String>,

    /// Tolerated clock difference in milliseconds. `-1` disables time checks.
    #[serde(default)]
    pub accepted_clock_skew_ms: i64,

    /// Upper bound on assertion lifetime from its `IssueInstant`; 0 disables.
    #[serde(default)]
    pub max_assertion_age_ms: i64,

    /// Tracks request IDs and requires responses to answer one of them.
    #[serde(default)]
    pub validate_in_response_to: bool,

    /// Lifetime of tracked request IDs.
    #[serde(default = "default_request_id_expiration")]
    pub request_id_expiration_period_ms: u64,

    /// Requires a signature on the assertion itself.
    #[serde(default)]
    pub want_assertions_signed: bool,

    /// Checks the signature of decrypted assertions.
    #[serde(default = "default_true")]
    pub validate_decrypted_assertion_signature: bool,
}

fn default_issuer() -> String {
    "onelogin_saml".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_path() -> String {
    "/saml/consume".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_identifier_format() -> Option<String> {
    Some(NameIdFormat::Email.uri().to_string())
}

fn default_authn_context() -> Vec<String> {
    vec![AuthnContextClass::PasswordProtectedTransport.uri().to_string()]
}

const fn default_request_id_expiration() -> u64 {
    8 * 60 * 60 * 1000
}

const fn default_true() -> bool {
    true
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(cert) => vec![cert],
        OneOrMany::Many(certs) => certs,
    })
}

impl Default for SamlConfig {
    fn default() -> Self {
        Self {
            entry_point: String::new(),
            issuer: default_issuer(),
            idp_cert: Vec::new(),
            callback_url: None,
            host: default_host(),
            path: default_path(),
            protocol: None,
            logout_url: None,
            logout_callback_url: None,
            identifier_format: default_identifier_format(),
            idp_issuer: None,
            audience: None,
            skip_audience_check: false,
            private_key: None,
            signing_cert: None,
            decryption_pvk: None,
            decryption_cert: None,
            signature_algorithm: SignatureAlgorithm::default(),
            digest_algorithm: None,
            authn_request_binding: SamlBinding::default(),
            authn_context: default_authn_context(),
            rac_comparison: AuthnContextComparison::default(),
            disable_requested_authn_context: false,
            disable_request_acs_url: false,
            force_authn: false,
            passive: false,
            skip_request_compression: false,
            attribute_consuming_service_index: None,
            provider_name: None,
            scoping: None,
            additional_params: BTreeMap::new(),
            additional_authorize_params: BTreeMap::new(),
            additional_logout_params: BTreeMap::new(),
            accepted_clock_skew_ms: 0,
            max_assertion_age_ms: 0,
            validate_in_response_to: false,
            request_id_expiration_period_ms: default_request_id_expiration(),
            want_assertions_signed: false,
            validate_decrypted_assertion_signature: true,
        }
    }
}

impl SamlConfig {
    /// Creates a configuration with the required settings and defaults
    /// for everything else.
    #[must_use]
    pub fn new(entry_point: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Adds a trusted IdP certificate.
    #[must_use]
    pub fn with_idp_cert(mut self, cert: impl Into<String>) -> Self {
        self.idp_cert.push(cert.into());
        self
    }

    /// Sets the assertion consumer URL.
    #[must_use]
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// Sets the IdP single logout URL.
    #[must_use]
    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = Some(url.into());
        self
    }

    /// Sets the SP logout endpoint advertised in metadata.
    #[must_use]
    pub fn with_logout_callback_url(mut self, url: impl Into<String>) -> Self {
        self.logout_callback_url = Some(url.into());
        self
    }

    /// Sets or clears the requested name ID format.
    #[must_use]
    pub fn with_identifier_format(mut self, format: Option<&str>) -> Self {
        self.identifier_format = format.map(str::to_string);
        self
    }

    /// Sets the expected IdP issuer.
    #[must_use]
    pub fn with_idp_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.idp_issuer = Some(issuer.into());
        self
    }

    /// Sets the expected audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the SP signing key and certificate.
    #[must_use]
    pub fn with_signing(mut self, key: impl Into<String>, cert: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self.signing_cert = Some(cert.into());
        self
    }

    /// Sets the SP decryption key and certificate.
    #[must_use]
    pub fn with_decryption(mut self, key: impl Into<String>, cert: impl Into<String>) -> Self {
        self.decryption_pvk = Some(key.into());
        self.decryption_cert = Some(cert.into());
        self
    }

    /// Sets the outbound signature algorithm.
    #[must_use]
    pub const fn with_signature_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature_algorithm = algorithm;
        self
    }

    /// Sets the binding for authentication requests.
    #[must_use]
    pub const fn with_authn_request_binding(mut self, binding: SamlBinding) -> Self {
        self.authn_request_binding = binding;
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub const fn with_clock_skew_ms(mut self, skew: i64) -> Self {
        self.accepted_clock_skew_ms = skew;
        self
    }

    /// Sets the maximum assertion age.
    #[must_use]
    pub const fn with_max_assertion_age_ms(mut self, age: i64) -> Self {
        self.max_assertion_age_ms = age;
        self
    }

    /// Enables or disables `InResponseTo` tracking.
    #[must_use]
    pub const fn with_validate_in_response_to(mut self, enabled: bool) -> Self {
        self.validate_in_response_to = enabled;
        self
    }

    /// Requires signed assertions.
    #[must_use]
    pub const fn with_want_assertions_signed(mut self, enabled: bool) -> Self {
        self.want_assertions_signed = enabled;
        self
    }

    /// The assertion consumer URL.
    ///
    /// A configured `callback_url` always wins; otherwise the URL is built
    /// from the protocol, `host` (or the configured host) and path.
    #[must_use]
    pub fn callback_url(&self, host: Option<&str>) -> String {
        if let Some(url) = &self.callback_url {
            return url.clone();
        }
        let scheme = self
            .protocol
            .as_deref()
            .unwrap_or("http:")
            .trim_end_matches(['/', ':']);
        let host = host.unwrap_or(&self.host);
        format!("{scheme}://{host}{}", self.path)
    }

    /// The IdP single logout URL.
    #[must_use]
    pub fn logout_url(&self) -> &str {
        self.logout_url.as_deref().unwrap_or(&self.entry_point)
    }

    /// The requested name ID format, `None` when disabled.
    #[must_use]
    pub fn identifier_format(&self) -> Option<&str> {
        self.identifier_format.as_deref().filter(|f| !f.is_empty())
    }

    /// The audience assertions must be restricted to, `None` when the
    /// check is skipped.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        if self.skip_audience_check {
            return None;
        }
        Some(self.audience.as_deref().unwrap_or(&self.issuer))
    }

    /// Digest used for enveloped signatures.
    #[must_use]
    pub fn digest_algorithm(&self) -> HashAlgorithm {
        self.digest_algorithm
            .unwrap_or_else(|| self.signature_algorithm.hash_algorithm())
    }

    /// Checks the settings that cannot be defaulted.
    ///
    /// ## Errors
    ///
    /// Returns [`SamlError::Configuration`] naming the first problem found.
    pub fn validate(&self) -> SamlResult<()> {
        if self.entry_point.is_empty() {
            return Err(SamlError::Configuration("entry_point is required".to_string()));
        }
        if self.issuer.is_empty() {
            return Err(SamlError::Configuration("issuer is required".to_string()));
        }
        if self.idp_cert.iter().all(|c| c.trim().is_empty()) {
            return Err(SamlError::Configuration("idp_cert is required".to_string()));
        }

        let urls = [
            ("entry_point", Some(self.entry_point.as_str())),
            ("logout_url", self.logout_url.as_deref()),
            ("callback_url", self.callback_url.as_deref()),
            ("logout_callback_url", self.logout_callback_url.as_deref()),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                url::Url::parse(url).map_err(|e| {
                    SamlError::Configuration(format!("{name} is not a valid URL: {e}"))
                })?;
            }
        }

        if self.accepted_clock_skew_ms < -1 {
            return Err(SamlError::Configuration(
                "accepted_clock_skew_ms must be -1 or greater".to_string(),
            ));
        }
        if self.max_assertion_age_ms < 0 {
            return Err(SamlError::Configuration(
                "max_assertion_age_ms must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
