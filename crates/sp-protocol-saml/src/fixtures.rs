//! Identity provider side of the unit tests: builds and signs the
//! messages the validators consume.

use base64::Engine;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use sp_cache::InMemoryReplayCache;
use sp_crypto::{Certificate, PrivateKey};

use crate::signature::XmlSigner;
use crate::types::saml_instant;

pub const IDP_KEY: &str = include_str!("../../../testdata/idp-key.pem");
pub const IDP_CERT: &str = include_str!("../../../testdata/idp-cert.pem");
pub const SP_KEY: &str = include_str!("../../../testdata/sp-key.pem");
pub const SP_CERT: &str = include_str!("../../../testdata/sp-cert.pem");
pub const ROGUE_KEY: &str = include_str!("../../../testdata/rogue-key.pem");

pub const SP_ENTITY: &str = "https://sp.example.com";
pub const IDP_ENTITY: &str = "https://idp.example.com";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn at(offset_secs: i64) -> String {
    saml_instant(now() + TimeDelta::seconds(offset_secs))
}

pub fn at_ms(offset_ms: i64) -> String {
    saml_instant(now() + TimeDelta::milliseconds(offset_ms))
}

pub fn idp_certs() -> Vec<Certificate> {
    vec![Certificate::parse(IDP_CERT).unwrap()]
}

pub fn sp_key() -> PrivateKey {
    PrivateKey::parse(SP_KEY).unwrap()
}

pub fn cache() -> InMemoryReplayCache {
    InMemoryReplayCache::new(std::time::Duration::from_secs(3600))
}

pub fn encode(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml)
}

/// Signs the element with `ID="{id}"` using `key_pem`.
pub fn sign_with(xml: &str, id: &str, key_pem: &str) -> String {
    XmlSigner::new(PrivateKey::parse(key_pem).unwrap(), None)
        .sign_element(xml, id)
        .unwrap()
}

pub fn sign(xml: &str, id: &str) -> String {
    sign_with(xml, id, IDP_KEY)
}

/// Knobs for a generated assertion.
#[derive(Debug, Clone)]
pub struct AssertionOptions {
    pub id: String,
    pub name_id: String,
    pub name_id_format: Option<String>,
    pub audience: Option<String>,
    pub conditions: bool,
    pub not_before: Option<String>,
    pub not_on_or_after: Option<String>,
    pub subject_in_response_to: Option<String>,
    pub subject_confirmations: usize,
    pub session_index: Option<String>,
    pub attributes: Vec<(String, Vec<String>)>,
}

impl Default for AssertionOptions {
    fn default() -> Self {
        Self {
            id: "_assertion".into(),
            name_id: "bob@example.com".into(),
            name_id_format: Some("urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress".into()),
            audience: Some(SP_ENTITY.into()),
            conditions: true,
            not_before: Some(at(-60)),
            not_on_or_after: Some(at(300)),
            subject_in_response_to: None,
            subject_confirmations: 1,
            session_index: Some("_session".into()),
            attributes: vec![("department".into(), vec!["ops".into()])],
        }
    }
}

pub fn assertion(opts: &AssertionOptions) -> String {
    let mut xml = format!(
        r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{}" Version="2.0" IssueInstant="{}"><saml:Issuer>{IDP_ENTITY}</saml:Issuer><saml:Subject>"#,
        opts.id,
        at(-1),
    );
    let format = opts
        .name_id_format
        .as_ref()
        .map(|f| format!(r#" Format="{f}""#))
        .unwrap_or_default();
    xml.push_str(&format!("<saml:NameID{format}>{}</saml:NameID>", opts.name_id));
    for _ in 0..opts.subject_confirmations {
        let irt = opts
            .subject_in_response_to
            .as_ref()
            .map(|v| format!(r#" InResponseTo="{v}""#))
            .unwrap_or_default();
        xml.push_str(&format!(
            r#"<saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer"><saml:SubjectConfirmationData{irt} NotOnOrAfter="{}" Recipient="{SP_ENTITY}/acs"/></saml:SubjectConfirmation>"#,
            at(300)
        ));
    }
    xml.push_str("</saml:Subject>");

    if opts.conditions {
        let mut attrs = String::new();
        if let Some(nb) = &opts.not_before {
            attrs.push_str(&format!(r#" NotBefore="{nb}""#));
        }
        if let Some(na) = &opts.not_on_or_after {
            attrs.push_str(&format!(r#" NotOnOrAfter="{na}""#));
        }
        xml.push_str(&format!("<saml:Conditions{attrs}>"));
        if let Some(audience) = &opts.audience {
            xml.push_str(&format!(
                "<saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience></saml:AudienceRestriction>"
            ));
        }
        xml.push_str("</saml:Conditions>");
    }

    let session = opts
        .session_index
        .as_ref()
        .map(|s| format!(r#" SessionIndex="{s}""#))
        .unwrap_or_default();
    xml.push_str(&format!(
        r#"<saml:AuthnStatement AuthnInstant="{}"{session}/>"#,
        at(-1)
    ));

    if !opts.attributes.is_empty() {
        xml.push_str("<saml:AttributeStatement>");
        for (name, values) in &opts.attributes {
            xml.push_str(&format!(r#"<saml:Attribute Name="{name}">"#));
            for value in values {
                xml.push_str(&format!("<saml:AttributeValue>{value}</saml:AttributeValue>"));
            }
            xml.push_str("</saml:Attribute>");
        }
        xml.push_str("</saml:AttributeStatement>");
    }
    xml.push_str("</saml:Assertion>");
    xml
}

/// Wraps `inner` in a successful `samlp:Response`.
pub fn response(in_response_to: Option<&str>, inner: &str) -> String {
    response_with_status(
        in_response_to,
        r#"<samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>"#,
        inner,
    )
}

pub fn response_with_status(in_response_to: Option<&str>, status: &str, inner: &str) -> String {
    let irt = in_response_to
        .map(|v| format!(r#" InResponseTo="{v}""#))
        .unwrap_or_default();
    format!(
        r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_response" Version="2.0" IssueInstant="{}" Destination="{SP_ENTITY}/acs"{irt}><saml:Issuer>{IDP_ENTITY}</saml:Issuer>{status}{inner}</samlp:Response>"#,
        at(-1)
    )
}

/// A `LogoutRequest` from the IdP for `bob@example.com`.
pub fn idp_logout_request(name_id_markup: &str) -> String {
    format!(
        r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_idp-logout" Version="2.0" IssueInstant="{}" Destination="{SP_ENTITY}/slo"><saml:Issuer>{IDP_ENTITY}</saml:Issuer>{name_id_markup}<samlp:SessionIndex>_session</samlp:SessionIndex></samlp:LogoutRequest>"#,
        at(-1)
    )
}

/// A `LogoutResponse` from the IdP answering `in_response_to`.
pub fn idp_logout_response(in_response_to: &str, status_code: &str) -> String {
    format!(
        r#"<samlp:LogoutResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_idp-logout-response" Version="2.0" IssueInstant="{}" InResponseTo="{in_response_to}"><saml:Issuer>{IDP_ENTITY}</saml:Issuer><samlp:Status><samlp:StatusCode Value="{status_code}"/></samlp:Status></samlp:LogoutResponse>"#,
        at(-1)
    )
}
