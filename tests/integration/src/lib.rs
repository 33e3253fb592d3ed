//! A simulated identity provider for end-to-end tests.
//!
//! [`TestIdp`] reads the requests a service provider sends and answers
//! them the way a real IdP would: signed responses, encrypted assertions,
//! IdP-initiated logout on the redirect binding.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use sp_crypto::{BlockCipher, Certificate, PrivateKey, SignatureAlgorithm};
use sp_protocol_saml::bindings::{
    build_redirect_url, decode_lenient, encode_message, QuerySigner, SamlMessageType,
};
use sp_protocol_saml::signature::XmlSigner;
use sp_protocol_saml::xmlenc::XmlEncryptor;
use sp_protocol_saml::SAML_NS;

pub const IDP_KEY: &str = include_str!("../../../testdata/idp-key.pem");
pub const IDP_CERT: &str = include_str!("../../../testdata/idp-cert.pem");
pub const SP_KEY: &str = include_str!("../../../testdata/sp-key.pem");
pub const SP_CERT: &str = include_str!("../../../testdata/sp-cert.pem");
pub const ROGUE_KEY: &str = include_str!("../../../testdata/rogue-key.pem");

pub const IDP_ENTITY: &str = "https://idp.example.com";
pub const IDP_SSO_URL: &str = "https://idp.example.com/sso";
pub const IDP_SLO_URL: &str = "https://idp.example.com/slo";
pub const SP_ENTITY: &str = "https://sp.example.com";
pub const SP_ACS_URL: &str = "https://sp.example.com/saml/acs";
pub const SP_SLO_URL: &str = "https://sp.example.com/saml/slo";

/// The user the IdP authenticates.
#[derive(Debug, Clone)]
pub struct User {
    pub name_id: String,
    pub session_index: String,
    pub attributes: Vec<(String, Vec<String>)>,
}

impl User {
    pub fn new(name_id: &str) -> Self {
        Self {
            name_id: name_id.to_string(),
            session_index: "_session-1".to_string(),
            attributes: vec![
                ("mail".to_string(), vec![name_id.to_string()]),
                ("groups".to_string(), vec!["admins".to_string(), "ops".to_string()]),
            ],
        }
    }
}

/// How a login response is produced.
#[derive(Debug, Clone)]
pub struct ResponseOptions {
    pub sign_response: bool,
    pub sign_assertion: bool,
    pub encrypt: Option<BlockCipher>,
    pub audience: String,
    pub lifetime: TimeDelta,
    pub signing_key: &'static str,
    pub status: Option<&'static str>,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            sign_response: true,
            sign_assertion: false,
            encrypt: None,
            audience: SP_ENTITY.to_string(),
            lifetime: TimeDelta::minutes(5),
            signing_key: IDP_KEY,
            status: None,
        }
    }
}

/// A request the IdP received on the redirect binding.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub id: String,
    pub xml: String,
    pub relay_state: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl ReceivedMessage {
    /// An attribute of the message's document element.
    pub fn root_attribute(&self, name: &str) -> Option<String> {
        let doc = roxmltree::Document::parse(&self.xml).ok()?;
        doc.root_element().attribute(name).map(str::to_string)
    }
}

/// The simulated identity provider.
pub struct TestIdp {
    now: DateTime<Utc>,
    sp_cert: Certificate,
}

impl TestIdp {
    pub fn new(now: DateTime<Utc>) -> anyhow::Result<Self> {
        Ok(Self {
            now,
            sp_cert: Certificate::parse(SP_CERT)?,
        })
    }

    fn instant(&self, offset: TimeDelta) -> String {
        (self.now + offset).to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Reads a message from a redirect URL the SP produced.
    pub fn read_redirect(&self, url: &str) -> anyhow::Result<ReceivedMessage> {
        let url = url::Url::parse(url)?;
        let params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        let encoded = params
            .get("SAMLRequest")
            .or_else(|| params.get("SAMLResponse"))
            .context("no SAML message in URL")?;
        let xml = decode_lenient(encoded)?;
        received(xml, params)
    }

    /// Reads the message from an auto-submit form the SP produced.
    pub fn read_form(&self, html: &str) -> anyhow::Result<ReceivedMessage> {
        let mut params = BTreeMap::new();
        for input in html.split("<input ").skip(1) {
            let (Some(name), Some(value)) = (html_attr(input, "name"), html_attr(input, "value"))
            else {
                continue;
            };
            params.insert(name, value);
        }
        let encoded = params.get("SAMLRequest").context("no SAMLRequest field")?;
        let xml = decode_lenient(encoded)?;
        received(xml, params)
    }

    /// Answers `in_response_to` with a login response for `user`, encoded
    /// as the SP receives it in the `SAMLResponse` form field.
    pub fn login_response(
        &self,
        in_response_to: Option<&str>,
        user: &User,
        opts: &ResponseOptions,
    ) -> anyhow::Result<String> {
        let mut assertion = self.assertion(in_response_to, user, opts);
        if opts.sign_assertion {
            assertion = signer(opts.signing_key)?.sign_element(&assertion, "_assertion-1")?;
        }
        if let Some(cipher) = opts.encrypt {
            assertion = XmlEncryptor::new(self.sp_cert.public_key().clone())
                .with_cipher(cipher)
                .encrypt(&assertion, "saml:EncryptedAssertion", SAML_NS)?;
        }

        let status = opts.status.unwrap_or("urn:oasis:names:tc:SAML:2.0:status:Success");
        let irt = in_response_to
            .map(|id| format!(r#" InResponseTo="{id}""#))
            .unwrap_or_default();
        let body = if opts.status.is_some() { "" } else { assertion.as_str() };
        let mut response = format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_response-1" Version="2.0" IssueInstant="{}" Destination="{SP_ACS_URL}"{irt}><saml:Issuer>{IDP_ENTITY}</saml:Issuer><samlp:Status><samlp:StatusCode Value="{status}"/></samlp:Status>{body}</samlp:Response>"#,
            self.instant(TimeDelta::zero()),
        );
        if opts.sign_response {
            response = signer(opts.signing_key)?.sign_root(&response)?;
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(response))
    }

    fn assertion(&self, in_response_to: Option<&str>, user: &User, opts: &ResponseOptions) -> String {
        let irt = in_response_to
            .map(|id| format!(r#" InResponseTo="{id}""#))
            .unwrap_or_default();
        let not_on_or_after = self.instant(opts.lifetime);
        let mut attributes = String::new();
        for (name, values) in &user.attributes {
            attributes.push_str(&format!(r#"<saml:Attribute Name="{name}">"#));
            for value in values {
                attributes.push_str(&format!("<saml:AttributeValue>{value}</saml:AttributeValue>"));
            }
            attributes.push_str("</saml:Attribute>");
        }
        format!(
            concat!(
                r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_assertion-1" Version="2.0" IssueInstant="{issued}">"#,
                "<saml:Issuer>{idp}</saml:Issuer>",
                "<saml:Subject>",
                r#"<saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">{name_id}</saml:NameID>"#,
                r#"<saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">"#,
                r#"<saml:SubjectConfirmationData{irt} NotOnOrAfter="{until}" Recipient="{acs}"/>"#,
                "</saml:SubjectConfirmation>",
                "</saml:Subject>",
                r#"<saml:Conditions NotBefore="{issued}" NotOnOrAfter="{until}">"#,
                "<saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience></saml:AudienceRestriction>",
                "</saml:Conditions>",
                r#"<saml:AuthnStatement AuthnInstant="{issued}" SessionIndex="{session}"/>"#,
                "<saml:AttributeStatement>{attributes}</saml:AttributeStatement>",
                "</saml:Assertion>"
            ),
            issued = self.instant(TimeDelta::zero()),
            idp = IDP_ENTITY,
            name_id = user.name_id,
            irt = irt,
            until = not_on_or_after,
            acs = SP_ACS_URL,
            audience = opts.audience,
            session = user.session_index,
            attributes = attributes,
        )
    }

    /// An IdP-initiated `LogoutRequest` on the redirect binding, signed on
    /// the query string with `signing_key` when given. Returns the decoded
    /// parameters and the raw query.
    pub fn logout_request_redirect(
        &self,
        user: &User,
        relay_state: &str,
        signing_key: Option<&str>,
    ) -> anyhow::Result<(BTreeMap<String, String>, String)> {
        let xml = format!(
            r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_idp-logout-1" Version="2.0" IssueInstant="{}" Destination="{SP_SLO_URL}" NotOnOrAfter="{}"><saml:Issuer>{IDP_ENTITY}</saml:Issuer><saml:NameID Format="urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress">{}</saml:NameID><samlp:SessionIndex>{}</samlp:SessionIndex></samlp:LogoutRequest>"#,
            self.instant(TimeDelta::zero()),
            self.instant(TimeDelta::minutes(5)),
            user.name_id,
            user.session_index,
        );
        self.redirect(SamlMessageType::Request, &xml, relay_state, signing_key)
    }

    /// Answers the SP `LogoutRequest` `in_response_to` on the redirect
    /// binding.
    pub fn logout_response_redirect(
        &self,
        in_response_to: &str,
        status: &str,
        signing_key: Option<&str>,
    ) -> anyhow::Result<(BTreeMap<String, String>, String)> {
        let xml = self.logout_response_xml(in_response_to, status);
        self.redirect(SamlMessageType::Response, &xml, "", signing_key)
    }

    /// Answers the SP `LogoutRequest` `in_response_to` on the POST binding
    /// with an enveloped signature.
    pub fn logout_response_post(&self, in_response_to: &str) -> anyhow::Result<String> {
        let xml = self.logout_response_xml(in_response_to, "urn:oasis:names:tc:SAML:2.0:status:Success");
        let signed = signer(IDP_KEY)?.sign_root(&xml)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(signed))
    }

    fn logout_response_xml(&self, in_response_to: &str, status: &str) -> String {
        format!(
            r#"<samlp:LogoutResponse xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_idp-logout-response-1" Version="2.0" IssueInstant="{}" Destination="{SP_SLO_URL}" InResponseTo="{in_response_to}"><saml:Issuer>{IDP_ENTITY}</saml:Issuer><samlp:Status><samlp:StatusCode Value="{status}"/></samlp:Status></samlp:LogoutResponse>"#,
            self.instant(TimeDelta::zero()),
        )
    }

    fn redirect(
        &self,
        message_type: SamlMessageType,
        xml: &str,
        relay_state: &str,
        signing_key: Option<&str>,
    ) -> anyhow::Result<(BTreeMap<String, String>, String)> {
        let key = signing_key.map(PrivateKey::parse).transpose()?;
        let mut params = Vec::new();
        if !relay_state.is_empty() {
            params.push(("RelayState".to_string(), relay_state.to_string()));
        }
        let url = build_redirect_url(
            SP_SLO_URL,
            message_type,
            &encode_message(xml, true)?,
            &params,
            key.as_ref().map(|key| QuerySigner {
                key,
                algorithm: SignatureAlgorithm::RsaSha256,
            }),
        )?;
        let url = url::Url::parse(&url)?;
        let query = url.query().context("redirect URL has no query")?.to_string();
        Ok((url.query_pairs().into_owned().collect(), query))
    }
}

fn signer(key_pem: &str) -> anyhow::Result<XmlSigner> {
    Ok(XmlSigner::new(PrivateKey::parse(key_pem)?, Some(Certificate::parse(IDP_CERT)?))
        .with_algorithm(SignatureAlgorithm::RsaSha256))
}

fn received(xml: String, params: BTreeMap<String, String>) -> anyhow::Result<ReceivedMessage> {
    let id = {
        let doc = roxmltree::Document::parse(&xml)?;
        doc.root_element()
            .attribute("ID")
            .ok_or_else(|| anyhow!("message has no ID"))?
            .to_string()
    };
    Ok(ReceivedMessage {
        id,
        relay_state: params.get("RelayState").cloned(),
        xml,
        params,
    })
}

/// Reads `name="..."` from the markup of one `<input>` tag.
fn html_attr(tag: &str, name: &str) -> Option<String> {
    let start = tag.find(&format!(r#"{name}=""#))? + name.len() + 2;
    let end = start + tag[start..].find('"')?;
    Some(
        tag[start..end]
            .replace("&quot;", "\"")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    )
}
