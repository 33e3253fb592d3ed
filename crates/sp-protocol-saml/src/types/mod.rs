//! SAML 2.0 types and data structures.
//!
//! Outbound request and logout messages, name identifiers, the profile
//! extracted from validated messages, and protocol constants.

mod authn_request;
mod constants;
mod logout;
mod name_id;
mod profile;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use name_id::*;
pub use profile::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats an instant the way SAML expects: UTC, millisecond precision.
#[must_use]
pub fn saml_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
