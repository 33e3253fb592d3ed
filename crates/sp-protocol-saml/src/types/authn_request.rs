//! SAML AuthnRequest types.
//!
//! Authentication request message sent by the service provider to the
//! identity provider. Optional parts are `None` or empty when not
//! configured and are then left out of the document entirely.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SamlResult;
use crate::xml::XmlWriter;

use super::{saml_instant, SamlBinding, SAMLP_NS, SAML_NS};

/// Comparison mode of a `RequestedAuthnContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// The context must match one of the listed classes.
    #[default]
    Exact,
    /// At least as strong as one of the listed classes.
    Minimum,
    /// No stronger than any of the listed classes.
    Maximum,
    /// Stronger than all listed classes.
    Better,
}

impl AuthnContextComparison {
    /// The attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }
}

impl fmt::Display for AuthnContextComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthnContextComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "minimum" => Ok(Self::Minimum),
            "maximum" => Ok(Self::Maximum),
            "better" => Ok(Self::Better),
            other => Err(format!(
                "rac_comparison must be one of exact, minimum, maximum, better (got {other})"
            )),
        }
    }
}

/// Name ID policy constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIdPolicy {
    /// Requested name ID format URI.
    pub format: String,
    /// Whether the IdP may create a new identifier.
    pub allow_create: bool,
}

/// Requested authentication context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAuthnContext {
    /// How the class references are compared.
    pub comparison: AuthnContextComparison,
    /// Authentication context class reference URIs.
    pub class_refs: Vec<String>,
}

/// An identity provider the service provider trusts for proxying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpEntry {
    /// The IdP's entity ID.
    pub provider_id: String,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Location of the IdP's single sign-on endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
}

/// An `IDPList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpList {
    /// Listed identity providers.
    #[serde(default)]
    pub entries: Vec<IdpEntry>,
    /// URI where the complete list can be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_complete: Option<String>,
}

/// IdP proxying constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoping {
    /// Maximum number of proxying steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_count: Option<u32>,
    /// Trusted identity providers.
    #[serde(default)]
    pub idp_list: Vec<IdpList>,
    /// Entities on whose behalf the request is made.
    #[serde(default)]
    pub requester_id: Vec<String>,
}

/// SAML Authentication Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,
    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,
    /// IdP single sign-on URL.
    pub destination: String,
    /// Entity ID of the service provider.
    pub issuer: String,
    /// Where the IdP should post its response.
    pub assertion_consumer_service_url: Option<String>,
    /// Binding the IdP should use for its response.
    pub protocol_binding: SamlBinding,
    /// The IdP must not interact with the user.
    pub is_passive: bool,
    /// The IdP must authenticate the user afresh.
    pub force_authn: bool,
    /// Name ID policy constraints.
    pub name_id_policy: Option<NameIdPolicy>,
    /// Requested authentication context.
    pub requested_authn_context: Option<RequestedAuthnContext>,
    /// Index into the SP's attribute consuming services.
    pub attribute_consuming_service_index: Option<String>,
    /// Human readable SP name.
    pub provider_name: Option<String>,
    /// IdP proxying constraints.
    pub scoping: Option<Scoping>,
}

impl AuthnRequest {
    /// Creates a minimal request; everything optional is unset.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        issue_instant: DateTime<Utc>,
        destination: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            issue_instant,
            destination: destination.into(),
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            protocol_binding: SamlBinding::HttpPost,
            is_passive: false,
            force_authn: false,
            name_id_policy: None,
            requested_authn_context: None,
            attribute_consuming_service_index: None,
            provider_name: None,
            scoping: None,
        }
    }

    /// Serializes the request.
    ///
    /// Child elements carry their own namespace declarations so that any
    /// of them can be canonicalized on its own.
    pub fn to_xml(&self) -> SamlResult<String> {
        let instant = saml_instant(self.issue_instant);
        let mut attributes = vec![
            ("xmlns:samlp", SAMLP_NS),
            ("ID", self.id.as_str()),
            ("Version", "2.0"),
            ("IssueInstant", instant.as_str()),
            ("ProtocolBinding", self.protocol_binding.uri()),
            ("Destination", self.destination.as_str()),
        ];
        if self.is_passive {
            attributes.push(("IsPassive", "true"));
        }
        if self.force_authn {
            attributes.push(("ForceAuthn", "true"));
        }
        if let Some(acs) = &self.assertion_consumer_service_url {
            attributes.push(("AssertionConsumerServiceURL", acs.as_str()));
        }
        if let Some(index) = &self.attribute_consuming_service_index {
            attributes.push(("AttributeConsumingServiceIndex", index.as_str()));
        }
        if let Some(name) = &self.provider_name {
            attributes.push(("ProviderName", name.as_str()));
        }

        let mut w = XmlWriter::new();
        w.start("samlp:AuthnRequest", &attributes)?;
        w.text_element("saml:Issuer", &[("xmlns:saml", SAML_NS)], &self.issuer)?;

        if let Some(policy) = &self.name_id_policy {
            w.empty(
                "samlp:NameIDPolicy",
                &[
                    ("xmlns:samlp", SAMLP_NS),
                    ("Format", policy.format.as_str()),
                    ("AllowCreate", if policy.allow_create { "true" } else { "false" }),
                ],
            )?;
        }

        if let Some(context) = &self.requested_authn_context {
            w.start(
                "samlp:RequestedAuthnContext",
                &[
                    ("xmlns:samlp", SAMLP_NS),
                    ("Comparison", context.comparison.as_str()),
                ],
            )?;
            for class_ref in &context.class_refs {
                w.text_element(
                    "saml:AuthnContextClassRef",
                    &[("xmlns:saml", SAML_NS)],
                    class_ref,
                )?;
            }
            w.end("samlp:RequestedAuthnContext")?;
        }

        if let Some(scoping) = &self.scoping {
            write_scoping(&mut w, scoping)?;
        }

        w.end("samlp:AuthnRequest")?;
        w.finish()
    }
}

fn write_scoping(w: &mut XmlWriter, scoping: &Scoping) -> SamlResult<()> {
    let proxy_count = scoping.proxy_count.map(|c| c.to_string());
    let mut attributes = vec![("xmlns:samlp", SAMLP_NS)];
    if let Some(count) = &proxy_count {
        attributes.push(("ProxyCount", count.as_str()));
    }
    w.start("samlp:Scoping", &attributes)?;

    for list in &scoping.idp_list {
        w.start("samlp:IDPList", &[("xmlns:samlp", SAMLP_NS)])?;
        for entry in &list.entries {
            let mut attributes = vec![
                ("xmlns:samlp", SAMLP_NS),
                ("ProviderID", entry.provider_id.as_str()),
            ];
            if let Some(name) = &entry.name {
                attributes.push(("Name", name.as_str()));
            }
            if let Some(loc) = &entry.loc {
                attributes.push(("Loc", loc.as_str()));
            }
            w.empty("samlp:IDPEntry", &attributes)?;
        }
        if let Some(get_complete) = &list.get_complete {
            w.text_element("samlp:GetComplete", &[], get_complete)?;
        }
        w.end("samlp:IDPList")?;
    }

    for requester in &scoping.requester_id {
        w.text_element("samlp:RequesterID", &[], requester)?;
    }
    w.end("samlp:Scoping")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthnContextClass, NameIdFormat};
    use crate::xml::{child, child_text, children, parse_document};
    use chrono::TimeZone;

    fn request() -> AuthnRequest {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        AuthnRequest::new("_abc", instant, "https://idp.example.com/sso", "https://sp.example.com")
    }

    #[test]
    fn minimal_request_has_no_optional_parts() {
        let xml = request().to_xml().unwrap();
        assert!(xml.starts_with(
            r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_abc" Version="2.0" IssueInstant="2024-05-01T12:00:00.000Z" ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Destination="https://idp.example.com/sso">"#
        ));
        for absent in ["IsPassive", "NameIDPolicy", "RequestedAuthnContext", "Scoping", "AssertionConsumerServiceURL"] {
            assert!(!xml.contains(absent), "{absent} should be absent");
        }
    }

    #[test]
    fn full_request_round_trips_through_parser() {
        let mut req = request();
        req.is_passive = true;
        req.force_authn = true;
        req.assertion_consumer_service_url = Some("https://sp.example.com/acs".into());
        req.attribute_consuming_service_index = Some("2".into());
        req.provider_name = Some("Example & Co".into());
        req.name_id_policy = Some(NameIdPolicy {
            format: NameIdFormat::Persistent.uri().into(),
            allow_create: true,
        });
        req.requested_authn_context = Some(RequestedAuthnContext {
            comparison: AuthnContextComparison::Minimum,
            class_refs: vec![
                AuthnContextClass::PasswordProtectedTransport.uri().into(),
                AuthnContextClass::X509.uri().into(),
            ],
        });
        req.scoping = Some(Scoping {
            proxy_count: Some(2),
            idp_list: vec![IdpList {
                entries: vec![IdpEntry {
                    provider_id: "https://idp-a".into(),
                    name: Some("A".into()),
                    loc: None,
                }],
                get_complete: Some("https://idp-list".into()),
            }],
            requester_id: vec!["r1".into(), "r2".into()],
        });

        let xml = req.to_xml().unwrap();
        let doc = parse_document(&xml).unwrap();
        let root = doc.root_element();

        assert_eq!(root.attribute("IsPassive"), Some("true"));
        assert_eq!(root.attribute("ForceAuthn"), Some("true"));
        assert_eq!(root.attribute("ProviderName"), Some("Example & Co"));
        assert_eq!(child_text(root, SAML_NS, "Issuer").as_deref(), Some("https://sp.example.com"));

        let policy = child(root, SAMLP_NS, "NameIDPolicy").unwrap();
        assert_eq!(policy.attribute("Format"), Some(NameIdFormat::Persistent.uri()));
        assert_eq!(policy.attribute("AllowCreate"), Some("true"));

        let context = child(root, SAMLP_NS, "RequestedAuthnContext").unwrap();
        assert_eq!(context.attribute("Comparison"), Some("minimum"));
        assert_eq!(children(context, SAML_NS, "AuthnContextClassRef").count(), 2);

        let scoping = child(root, SAMLP_NS, "Scoping").unwrap();
        assert_eq!(scoping.attribute("ProxyCount"), Some("2"));
        let list = child(scoping, SAMLP_NS, "IDPList").unwrap();
        let entry = child(list, SAMLP_NS, "IDPEntry").unwrap();
        assert_eq!(entry.attribute("Name"), Some("A"));
        assert_eq!(entry.attribute("Loc"), None);
        assert_eq!(child_text(list, SAMLP_NS, "GetComplete").as_deref(), Some("https://idp-list"));
        assert_eq!(children(scoping, SAMLP_NS, "RequesterID").count(), 2);
    }

    #[test]
    fn comparison_parses_config_values() {
        assert_eq!("better".parse::<AuthnContextComparison>(), Ok(AuthnContextComparison::Better));
        assert!("fuzzy".parse::<AuthnContextComparison>().is_err());
    }
}
