//! SAML Logout types.
//!
//! Outbound single logout messages: the SP-initiated `LogoutRequest` and
//! the `LogoutResponse` answering an IdP-initiated request.

use chrono::{DateTime, Utc};

use crate::error::SamlResult;
use crate::xml::XmlWriter;

use super::{saml_instant, status_codes, LogoutSubject, SAMLP_NS, SAML_NS};

/// SAML Logout Request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,
    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,
    /// IdP single logout URL.
    pub destination: String,
    /// Entity ID of the service provider.
    pub issuer: String,
    /// The session being terminated.
    pub subject: LogoutSubject,
}

impl LogoutRequest {
    /// Creates a logout request for `subject`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        issue_instant: DateTime<Utc>,
        destination: impl Into<String>,
        issuer: impl Into<String>,
        subject: LogoutSubject,
    ) -> Self {
        Self {
            id: id.into(),
            issue_instant,
            destination: destination.into(),
            issuer: issuer.into(),
            subject,
        }
    }

    /// Serializes the request.
    pub fn to_xml(&self) -> SamlResult<String> {
        let instant = saml_instant(self.issue_instant);
        let name_id = &self.subject.name_id;

        let mut w = XmlWriter::new();
        w.start(
            "samlp:LogoutRequest",
            &[
                ("xmlns:samlp", SAMLP_NS),
                ("xmlns:saml", SAML_NS),
                ("ID", self.id.as_str()),
                ("Version", "2.0"),
                ("IssueInstant", instant.as_str()),
                ("Destination", self.destination.as_str()),
            ],
        )?;
        w.text_element("saml:Issuer", &[("xmlns:saml", SAML_NS)], &self.issuer)?;

        let mut attributes = Vec::new();
        if let Some(format) = &name_id.format {
            attributes.push(("Format", format.as_str()));
        }
        if let Some(qualifier) = &name_id.name_qualifier {
            attributes.push(("NameQualifier", qualifier.as_str()));
        }
        if let Some(qualifier) = &name_id.sp_name_qualifier {
            attributes.push(("SPNameQualifier", qualifier.as_str()));
        }
        w.text_element("saml:NameID", &attributes, &name_id.value)?;

        if let Some(index) = &self.subject.session_index {
            w.text_element("saml2p:SessionIndex", &[("xmlns:saml2p", SAMLP_NS)], index)?;
        }

        w.end("samlp:LogoutRequest")?;
        w.finish()
    }
}

/// SAML Logout Response reporting success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutResponse {
    /// Unique identifier for this response.
    pub id: String,
    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,
    /// IdP single logout URL.
    pub destination: String,
    /// Entity ID of the service provider.
    pub issuer: String,
    /// `ID` of the request being answered.
    pub in_response_to: String,
}

impl LogoutResponse {
    /// Creates a success response to `in_response_to`.
    #[must_use]
    pub fn success(
        id: impl Into<String>,
        issue_instant: DateTime<Utc>,
        destination: impl Into<String>,
        issuer: impl Into<String>,
        in_response_to: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            issue_instant,
            destination: destination.into(),
            issuer: issuer.into(),
            in_response_to: in_response_to.into(),
        }
    }

    /// Serializes the response.
    pub fn to_xml(&self) -> SamlResult<String> {
        let instant = saml_instant(self.issue_instant);

        let mut w = XmlWriter::new();
        w.start(
            "samlp:LogoutResponse",
            &[
                ("xmlns:samlp", SAMLP_NS),
                ("xmlns:saml", SAML_NS),
                ("ID", self.id.as_str()),
                ("Version", "2.0"),
                ("IssueInstant", instant.as_str()),
                ("Destination", self.destination.as_str()),
                ("InResponseTo", self.in_response_to.as_str()),
            ],
        )?;
        w.text_element("saml:Issuer", &[], &self.issuer)?;
        w.start("samlp:Status", &[])?;
        w.empty("samlp:StatusCode", &[("Value", status_codes::SUCCESS)])?;
        w.end("samlp:Status")?;
        w.end("samlp:LogoutResponse")?;
        w.finish()
    }
}
