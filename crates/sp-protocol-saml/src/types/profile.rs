//! Validated user profiles and validation outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{LogoutSubject, NameId};

/// Value of a SAML attribute: one value, or several in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Exactly one `AttributeValue`.
    Single(String),
    /// Two or more `AttributeValue`s.
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// Builds a value from the collected texts; `None` when empty.
    #[must_use]
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Single),
            _ => Some(Self::Multiple(values)),
        }
    }

    /// The scalar value, or the first of several.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multiple(values) => values.first().map(String::as_str),
        }
    }

    /// All values in document order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// The identity extracted from a validated assertion or logout request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// `ID` of an IdP-initiated `LogoutRequest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Issuer of the assertion or logout request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// `InResponseTo` of the enclosing response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// `SessionIndex` of the authentication statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,

    /// Subject name identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// Attribute statements, keyed by attribute `Name`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,

    /// Mail address, from a `mail` attribute or the LDAP mail OID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,

    /// Mirrors `mail` unless the IdP sent an `email` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// The assertion as received (after decryption).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_xml: Option<String>,

    /// The whole response document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_xml: Option<String>,
}

impl Profile {
    /// Looks a field up by name, top-level fields first, then attributes.
    ///
    /// This is the flat view callers get when they treat the profile as a
    /// map: an attribute named like a top-level field is shadowed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let top_level = match key {
            "ID" => self.id.as_deref(),
            "issuer" => self.issuer.as_deref(),
            "inResponseTo" => self.in_response_to.as_deref(),
            "sessionIndex" => self.session_index.as_deref(),
            "nameID" => self.name_id.as_ref().map(|n| n.value.as_str()),
            "nameIDFormat" => self.name_id.as_ref().and_then(|n| n.format.as_deref()),
            "nameQualifier" => self.name_id.as_ref().and_then(|n| n.name_qualifier.as_deref()),
            "spNameQualifier" => self
                .name_id
                .as_ref()
                .and_then(|n| n.sp_name_qualifier.as_deref()),
            "mail" => self.mail.as_deref(),
            "email" => self.email.as_deref(),
            _ => None,
        };
        top_level.or_else(|| self.attributes.get(key).and_then(AttributeValue::first))
    }

    /// The session to reference when logging this user out.
    #[must_use]
    pub fn logout_subject(&self) -> Option<LogoutSubject> {
        self.name_id.clone().map(|name_id| LogoutSubject {
            name_id,
            session_index: self.session_index.clone(),
        })
    }
}

/// Result of validating an inbound SAML message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// A login assertion was accepted.
    SignedIn(Box<Profile>),
    /// The IdP refused passive authentication; the user is not logged in.
    NoPassive,
    /// A logout message was accepted. IdP-initiated requests carry the
    /// profile of the user being logged out.
    LoggedOut(Option<Box<Profile>>),
}

impl ValidationOutcome {
    /// The profile carried by this outcome, if any.
    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::SignedIn(profile) => Some(profile),
            Self::LoggedOut(profile) => profile.as_deref(),
            Self::NoPassive => None,
        }
    }

    /// Returns `true` for single logout outcomes.
    #[must_use]
    pub const fn is_logout(&self) -> bool {
        matches!(self, Self::LoggedOut(_))
    }
}
