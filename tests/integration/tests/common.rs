//! Common test utilities and fixtures.

use chrono::{DateTime, TimeZone, Utc};
use sp_integration_tests::{
    TestIdp, IDP_CERT, IDP_ENTITY, IDP_SLO_URL, IDP_SSO_URL, SP_ACS_URL, SP_CERT, SP_ENTITY,
    SP_KEY, SP_SLO_URL,
};
use sp_protocol_saml::{SamlConfig, ServiceProvider};

/// A service provider wired to the simulated identity provider.
pub struct TestEnv {
    /// Fixed test time.
    pub now: DateTime<Utc>,
    /// The service provider under test.
    pub sp: ServiceProvider,
    /// The identity provider.
    pub idp: TestIdp,
}

impl TestEnv {
    /// Creates the default environment: replay protection on, decryption
    /// configured, no request signing.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(|config| config)
    }

    /// Creates an environment after adjusting the base configuration.
    pub fn with_config(adjust: impl FnOnce(SamlConfig) -> SamlConfig) -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("sp_protocol_saml=debug")
            .with_test_writer()
            .try_init();

        let now = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("invalid test time"))?;

        let config = SamlConfig::new(IDP_SSO_URL, SP_ENTITY)
            .with_idp_cert(IDP_CERT)
            .with_idp_issuer(IDP_ENTITY)
            .with_callback_url(SP_ACS_URL)
            .with_logout_url(IDP_SLO_URL)
            .with_logout_callback_url(SP_SLO_URL)
            .with_decryption(SP_KEY, SP_CERT)
            .with_validate_in_response_to(true);

        let sp = ServiceProvider::new(adjust(config))?.with_clock(move || now);
        Ok(Self {
            now,
            sp,
            idp: TestIdp::new(now)?,
        })
    }

    /// The service provider observing a different time.
    pub fn sp_at(&self, at: DateTime<Utc>) -> ServiceProvider {
        self.sp.clone().with_clock(move || at)
    }
}
