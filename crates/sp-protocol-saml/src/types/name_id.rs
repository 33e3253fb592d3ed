//! Subject identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NameIdFormat;

/// A `NameID` as issued by the IdP.
///
/// Kept verbatim so a later `LogoutRequest` can echo the exact value,
/// format and qualifiers back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// Element text.
    pub value: String,

    /// `Format`; absent means unspecified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// `NameQualifier`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,

    /// `SPNameQualifier`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Unqualified identifier without a format.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// `emailAddress` identifier.
    #[must_use]
    pub fn email(address: impl Into<String>) -> Self {
        Self::new(address).with_format(NameIdFormat::Email.uri())
    }

    /// Sets `Format`.
    #[must_use]
    pub fn with_format(self, format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..self
        }
    }

    /// Sets both qualifiers at once, as they arrive on the element.
    #[must_use]
    pub fn with_qualifiers(
        self,
        name_qualifier: Option<String>,
        sp_name_qualifier: Option<String>,
    ) -> Self {
        Self {
            name_qualifier,
            sp_name_qualifier,
            ..self
        }
    }

    /// Standard format of this identifier; custom URIs map to `Unspecified`.
    #[must_use]
    pub fn parsed_format(&self) -> NameIdFormat {
        self.format
            .as_deref()
            .and_then(NameIdFormat::from_uri)
            .unwrap_or_default()
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name_qualifier {
            Some(qualifier) => write!(f, "{qualifier}!{}", self.value),
            None => f.write_str(&self.value),
        }
    }
}

/// Who to log out: the identifier and, when known, the IdP session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutSubject {
    /// Identifier received at login.
    pub name_id: NameId,

    /// `AuthnStatement/@SessionIndex` received at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,
}

impl LogoutSubject {
    /// Logs out every session of `name_id`.
    #[must_use]
    pub const fn new(name_id: NameId) -> Self {
        Self {
            name_id,
            session_index: None,
        }
    }

    /// Restricts the logout to one IdP session.
    #[must_use]
    pub fn with_session_index(self, index: impl Into<String>) -> Self {
        Self {
            session_index: Some(index.into()),
            ..self
        }
    }
}
