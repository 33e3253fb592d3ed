//! Web Browser SSO flows.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use sp_crypto::{BlockCipher, Certificate};
use sp_integration_tests::{ResponseOptions, User, ROGUE_KEY, SP_ACS_URL, SP_CERT, SP_KEY};
use sp_protocol_saml::signature::verify_node_signature;
use sp_protocol_saml::status_codes::NO_PASSIVE;
use sp_protocol_saml::{AttributeValue, SamlError, ValidationOutcome};

use crate::common::TestEnv;

/// Tests the redirect-binding login round trip and that the response
/// cannot be replayed.
#[tokio::test]
async fn test_sp_initiated_login() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let url = env
        .sp
        .authorize_url(Some("/dashboard"), None, &BTreeMap::new())
        .await?;
    let request = env.idp.read_redirect(&url)?;
    assert_eq!(request.relay_state.as_deref(), Some("/dashboard"));
    assert_eq!(
        request.root_attribute("AssertionConsumerServiceURL").as_deref(),
        Some(SP_ACS_URL)
    );

    let user = User::new("alice@example.com");
    let response = env
        .idp
        .login_response(Some(&request.id), &user, &ResponseOptions::default())?;

    let outcome = env.sp.validate_post_response(&response).await?;
    let ValidationOutcome::SignedIn(profile) = &outcome else {
        panic!("expected a signed-in outcome, got {outcome:?}");
    };
    assert_eq!(profile.get("nameID"), Some("alice@example.com"));
    assert_eq!(profile.in_response_to.as_deref(), Some(request.id.as_str()));
    assert_eq!(profile.session_index.as_deref(), Some("_session-1"));
    assert_eq!(profile.mail.as_deref(), Some("alice@example.com"));
    assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
    assert_eq!(
        profile.attributes.get("groups").map(AttributeValue::values),
        Some(vec!["admins", "ops"])
    );

    let replayed = env.sp.validate_post_response(&response).await;
    assert!(
        matches!(replayed, Err(SamlError::Replay(_))),
        "Replayed response should be rejected, got {replayed:?}"
    );

    Ok(())
}

/// Tests that the POST-binding request carries a valid enveloped
/// signature from the SP key.
#[tokio::test]
async fn test_post_binding_request_is_signed() -> anyhow::Result<()> {
    let env = TestEnv::with_config(|config| config.with_signing(SP_KEY, SP_CERT))?;

    let form = env.sp.authorize_form(Some("state-1"), None).await?;
    let request = env.idp.read_form(&form)?;
    assert_eq!(request.relay_state.as_deref(), Some("state-1"));

    let doc = roxmltree::Document::parse(&request.xml)?;
    let sp_cert = Certificate::parse(SP_CERT)?;
    assert!(verify_node_signature(doc.root_element(), &[sp_cert])?);

    let response = env.idp.login_response(
        Some(&request.id),
        &User::new("bob@example.com"),
        &ResponseOptions::default(),
    )?;
    assert!(env.sp.validate_post_response(&response).await?.profile().is_some());

    Ok(())
}

/// Tests that signed redirect requests carry SigAlg and Signature.
#[tokio::test]
async fn test_redirect_request_query_is_signed() -> anyhow::Result<()> {
    let env = TestEnv::with_config(|config| config.with_signing(SP_KEY, SP_CERT))?;

    let url = env.sp.authorize_url(None, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    assert!(request.params.contains_key("SigAlg"));
    assert!(request.params.contains_key("Signature"));
    assert!(!request.xml.contains("Signature"), "redirect requests are signed on the query");

    Ok(())
}

/// Tests encrypted assertions with each advertised content cipher.
#[tokio::test]
async fn test_encrypted_assertion() -> anyhow::Result<()> {
    for cipher in [BlockCipher::Aes128Gcm, BlockCipher::Aes256Cbc] {
        let env = TestEnv::new()?;
        let url = env.sp.authorize_url(None, None, &BTreeMap::new()).await?;
        let request = env.idp.read_redirect(&url)?;

        let opts = ResponseOptions {
            sign_response: false,
            sign_assertion: true,
            encrypt: Some(cipher),
            ..ResponseOptions::default()
        };
        let response = env
            .idp
            .login_response(Some(&request.id), &User::new("carol@example.com"), &opts)?;

        let outcome = env.sp.validate_post_response(&response).await?;
        assert_eq!(
            outcome.profile().and_then(|p| p.get("nameID")),
            Some("carol@example.com"),
            "cipher {cipher:?}"
        );
    }
    Ok(())
}

/// Tests that a response signed by an untrusted key is rejected and
/// retires the pending request.
#[tokio::test]
async fn test_forged_response_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let url = env.sp.authorize_url(None, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    let user = User::new("mallory@example.com");

    let forged = ResponseOptions {
        signing_key: ROGUE_KEY,
        ..ResponseOptions::default()
    };
    let response = env.idp.login_response(Some(&request.id), &user, &forged)?;
    let err = env.sp.validate_post_response(&response).await.unwrap_err();
    assert!(matches!(err, SamlError::InvalidSignature(_)), "got {err:?}");

    let genuine = env
        .idp
        .login_response(Some(&request.id), &user, &ResponseOptions::default())?;
    let err = env.sp.validate_post_response(&genuine).await.unwrap_err();
    assert!(matches!(err, SamlError::Replay(_)), "got {err:?}");

    Ok(())
}

/// Tests that unsolicited responses are rejected while replay protection
/// is on.
#[tokio::test]
async fn test_unsolicited_response_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let response = env.idp.login_response(
        None,
        &User::new("alice@example.com"),
        &ResponseOptions::default(),
    )?;
    let err = env.sp.validate_post_response(&response).await.unwrap_err();
    assert!(matches!(err, SamlError::Replay(_)), "got {err:?}");
    Ok(())
}

/// Tests expiry and audience enforcement.
#[tokio::test]
async fn test_expired_and_misdirected_assertions() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = User::new("alice@example.com");

    let url = env.sp.authorize_url(None, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    let response = env
        .idp
        .login_response(Some(&request.id), &user, &ResponseOptions::default())?;
    let late = env.sp_at(env.now + TimeDelta::minutes(10));
    let err = late.validate_post_response(&response).await.unwrap_err();
    assert!(matches!(err, SamlError::Temporal(_)), "got {err:?}");

    let url = env.sp.authorize_url(None, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    let misdirected = ResponseOptions {
        audience: "https://other-sp.example.com".to_string(),
        ..ResponseOptions::default()
    };
    let response = env.idp.login_response(Some(&request.id), &user, &misdirected)?;
    let err = env.sp.validate_post_response(&response).await.unwrap_err();
    assert!(matches!(err, SamlError::Audience(_)), "got {err:?}");

    Ok(())
}

/// Tests that a NoPassive status ends a passive login without a profile.
#[tokio::test]
async fn test_passive_login_declined() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let xml = env.sp.authn_request_xml(true, false, None).await?;
    assert!(xml.contains(r#"IsPassive="true""#));

    let id = roxmltree::Document::parse(&xml)?
        .root_element()
        .attribute("ID")
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("request has no ID"))?;
    let declined = ResponseOptions {
        status: Some(NO_PASSIVE),
        ..ResponseOptions::default()
    };
    let response = env
        .idp
        .login_response(Some(&id), &User::new("alice@example.com"), &declined)?;
    assert_eq!(
        env.sp.validate_post_response(&response).await?,
        ValidationOutcome::NoPassive
    );

    Ok(())
}

/// Tests that clones of a service provider share pending requests.
#[tokio::test]
async fn test_clones_share_replay_cache() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let other = env.sp.clone();

    let url = env.sp.authorize_url(None, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    let response = env.idp.login_response(
        Some(&request.id),
        &User::new("alice@example.com"),
        &ResponseOptions::default(),
    )?;
    assert!(other.validate_post_response(&response).await.is_ok());
    assert!(env.sp.validate_post_response(&response).await.is_err());

    Ok(())
}
