//! Single Logout flows.

use std::collections::BTreeMap;

use sp_integration_tests::{User, IDP_KEY, IDP_SLO_URL, ROGUE_KEY, SP_SLO_URL};
use sp_protocol_saml::status_codes::{REQUESTER, SUCCESS};
use sp_protocol_saml::{SamlError, ValidationOutcome};

use crate::common::TestEnv;

/// Tests an IdP-initiated logout on the redirect binding and the SP's
/// answer.
#[tokio::test]
async fn test_idp_initiated_logout() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = User::new("alice@example.com");

    let (params, query) = env
        .idp
        .logout_request_redirect(&user, "/goodbye", Some(IDP_KEY))?;
    let outcome = env.sp.validate_redirect(&params, &query).await?;
    let profile = outcome
        .profile()
        .ok_or_else(|| anyhow::anyhow!("logout request should carry a profile"))?;
    assert!(outcome.is_logout());
    assert_eq!(profile.get("nameID"), Some("alice@example.com"));
    assert_eq!(profile.session_index.as_deref(), Some("_session-1"));

    let request_id = profile.id.clone().unwrap_or_default();
    let relay_state = params.get("RelayState").map(String::as_str);
    let url = env
        .sp
        .logout_response_url(&request_id, relay_state, &BTreeMap::new())?;
    assert!(url.starts_with(IDP_SLO_URL));

    let answer = env.idp.read_redirect(&url)?;
    assert_eq!(answer.root_attribute("InResponseTo"), Some(request_id));
    assert_eq!(answer.relay_state.as_deref(), Some("/goodbye"));
    assert!(answer.xml.contains(SUCCESS));

    Ok(())
}

/// Tests that a query signature from an untrusted key is rejected.
#[tokio::test]
async fn test_forged_logout_request_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (params, query) = env.idp.logout_request_redirect(
        &User::new("alice@example.com"),
        "",
        Some(ROGUE_KEY),
    )?;
    let err = env.sp.validate_redirect(&params, &query).await.unwrap_err();
    assert!(matches!(err, SamlError::InvalidSignature(_)), "got {err:?}");
    Ok(())
}

/// Tests that a redirect logout request without a query signature is
/// rejected.
#[tokio::test]
async fn test_unsigned_logout_request_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (params, query) = env
        .idp
        .logout_request_redirect(&User::new("victim@example.com"), "", None)?;
    assert!(!params.contains_key("Signature"));

    let err = env.sp.validate_redirect(&params, &query).await.unwrap_err();
    assert!(matches!(err, SamlError::InvalidSignature(_)), "got {err:?}");
    Ok(())
}

/// Tests that a second `SAMLRequest` appended to a genuinely signed query
/// is not processed.
#[tokio::test]
async fn test_appended_logout_request_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let (_, signed_query) = env
        .idp
        .logout_request_redirect(&User::new("alice@example.com"), "", Some(IDP_KEY))?;
    let (_, unsigned_query) = env
        .idp
        .logout_request_redirect(&User::new("admin@example.com"), "", None)?;

    let query = format!("{signed_query}&{unsigned_query}");
    let url = url::Url::parse(&format!("{SP_SLO_URL}?{query}"))?;
    let params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();

    let err = env.sp.validate_redirect(&params, &query).await.unwrap_err();
    assert!(matches!(err, SamlError::MalformedMessage(_)), "got {err:?}");
    Ok(())
}

/// Tests an SP-initiated logout answered on the redirect binding.
#[tokio::test]
async fn test_sp_initiated_logout_redirect() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = User::new("alice@example.com");

    let subject = sp_protocol_saml::LogoutSubject::new(
        sp_protocol_saml::NameId::email(&user.name_id),
    )
    .with_session_index(&user.session_index);
    let url = env.sp.logout_url(&subject, Some("/bye"), &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    assert!(request.xml.contains("_session-1"));

    let (params, query) = env
        .idp
        .logout_response_redirect(&request.id, SUCCESS, Some(IDP_KEY))?;
    assert_eq!(
        env.sp.validate_redirect(&params, &query).await?,
        ValidationOutcome::LoggedOut(None)
    );

    let replayed = env.sp.validate_redirect(&params, &query).await;
    assert!(matches!(replayed, Err(SamlError::Replay(_))), "got {replayed:?}");

    Ok(())
}

/// Tests an SP-initiated logout answered on the POST binding, and a failed
/// logout status.
#[tokio::test]
async fn test_sp_initiated_logout_post() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let subject = sp_protocol_saml::LogoutSubject::new(sp_protocol_saml::NameId::email(
        "alice@example.com",
    ));

    let url = env.sp.logout_url(&subject, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    let form = BTreeMap::from([(
        "SAMLResponse".to_string(),
        env.idp.logout_response_post(&request.id)?,
    )]);
    assert_eq!(
        env.sp.validate_logout_post(&form).await?,
        ValidationOutcome::LoggedOut(None)
    );

    let url = env.sp.logout_url(&subject, None, &BTreeMap::new()).await?;
    let request = env.idp.read_redirect(&url)?;
    let (params, query) = env
        .idp
        .logout_response_redirect(&request.id, REQUESTER, Some(IDP_KEY))?;
    let err = env.sp.validate_redirect(&params, &query).await.unwrap_err();
    assert!(matches!(err, SamlError::Status { .. }), "got {err:?}");

    Ok(())
}
