//! End-to-End Integration Tests
//!
//! These tests drive complete SSO and SLO exchanges between a
//! [`ServiceProvider`](sp_protocol_saml::ServiceProvider) and a simulated
//! identity provider.

mod common;
mod logout_flows;
mod metadata;
mod sso_flows;
