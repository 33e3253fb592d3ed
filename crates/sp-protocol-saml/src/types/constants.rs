//! Namespaces and well-known URIs.

use serde::{Deserialize, Serialize};

/// Assertion namespace.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
/// Protocol namespace.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
/// Metadata namespace.
pub const METADATA_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";
/// XML-DSig namespace.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
/// XML Encryption namespace.
pub const XMLENC_NS: &str = "http://www.w3.org/2001/04/xmlenc#";
/// Home of the GCM algorithm URIs.
pub const XMLENC11_NS: &str = "http://www.w3.org/2009/xmlenc11#";

/// Advertised in `SPSSODescriptor/@protocolSupportEnumeration`.
pub const PROTOCOL_SUPPORT: &str = SAMLP_NS;

/// `mail` from the LDAP schema; directory-backed IdPs release the address
/// under this name.
pub const MAIL_OID: &str = "urn:oid:0.9.2342.19200300.100.1.3";

const BINDING_PREFIX: &str = "urn:oasis:names:tc:SAML:2.0:bindings:";

/// Transport for a protocol message.
///
/// Configured by short name (`"HTTP-POST"`, `"HTTP-Redirect"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SamlBinding {
    /// Deflated, base64 query parameter.
    #[default]
    #[serde(rename = "HTTP-Redirect")]
    HttpRedirect,
    /// Base64 form field.
    #[serde(rename = "HTTP-POST")]
    HttpPost,
}

impl SamlBinding {
    const fn short_name(self) -> &'static str {
        match self {
            Self::HttpPost => "HTTP-POST",
            Self::HttpRedirect => "HTTP-Redirect",
        }
    }

    /// Full binding URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::HttpPost => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Self::HttpRedirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
        }
    }

    /// Inverse of [`SamlBinding::uri`].
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let name = uri.strip_prefix(BINDING_PREFIX)?;
        [Self::HttpPost, Self::HttpRedirect]
            .into_iter()
            .find(|binding| binding.short_name() == name)
    }
}

const NAME_ID_FORMATS: [(NameIdFormat, &str); 6] = [
    (NameIdFormat::Unspecified, "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified"),
    (NameIdFormat::Email, "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress"),
    (NameIdFormat::X509SubjectName, "urn:oasis:names:tc:SAML:1.1:nameid-format:X509SubjectName"),
    (NameIdFormat::Entity, "urn:oasis:names:tc:SAML:2.0:nameid-format:entity"),
    (NameIdFormat::Persistent, "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent"),
    (NameIdFormat::Transient, "urn:oasis:names:tc:SAML:2.0:nameid-format:transient"),
];

/// Standard `NameID/@Format` values.
///
/// Formats are carried as strings everywhere else so that IdP-specific
/// URIs survive; this enum only names the common ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    /// No particular format.
    #[default]
    Unspecified,
    /// `emailAddress`.
    Email,
    /// Certificate subject DN.
    X509SubjectName,
    /// Entity ID of a provider.
    Entity,
    /// Opaque, stable per SP.
    Persistent,
    /// Opaque, one per session.
    Transient,
}

impl NameIdFormat {
    /// Full format URI.
    #[must_use]
    pub fn uri(&self) -> &'static str {
        NAME_ID_FORMATS
            .iter()
            .find(|(format, _)| format == self)
            .map_or(NAME_ID_FORMATS[0].1, |(_, uri)| uri)
    }

    /// `None` for formats outside the standard set.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        NAME_ID_FORMATS
            .iter()
            .find(|(_, known)| *known == uri)
            .map(|(format, _)| *format)
    }
}

/// `AuthnContextClassRef` values offered in the requested context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AuthnContextClass {
    Password,
    /// Password over TLS. The default request.
    PasswordProtectedTransport,
    X509,
    Kerberos,
    /// Integrated Windows authentication (ADFS).
    Windows,
}

impl AuthnContextClass {
    /// Class reference URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Password => "urn:oasis:names:tc:SAML:2.0:ac:classes:Password",
            Self::PasswordProtectedTransport => {
                "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport"
            }
            Self::X509 => "urn:oasis:names:tc:SAML:2.0:ac:classes:X509",
            Self::Kerberos => "urn:oasis:names:tc:SAML:2.0:ac:classes:Kerberos",
            Self::Windows => "urn:federation:authentication:windows",
        }
    }
}

/// Top-level `StatusCode/@Value`s the validator distinguishes.
pub mod status_codes {
    #![allow(missing_docs)]

    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
    /// Second-level code under `Responder` for a refused `IsPassive` login.
    pub const NO_PASSIVE: &str = "urn:oasis:names:tc:SAML:2.0:status:NoPassive";

    /// Last `:`-separated segment, `Responder` for [`RESPONDER`].
    #[must_use]
    pub fn suffix(code: &str) -> &str {
        code.rsplit(':').next().unwrap_or(code)
    }
}
