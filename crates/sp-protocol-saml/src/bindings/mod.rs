//! SAML bindings implementation.
//!
//! This module implements the SAML 2.0 bindings for message transport:
//!
//! - **HTTP-POST Binding** - Messages are base64-encoded and sent in HTML forms
//! - **HTTP-Redirect Binding** - Messages are deflated, base64-encoded, and URL-encoded,
//!   with an optional detached query signature

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use std::collections::BTreeMap;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// `AuthnRequest` or `LogoutRequest`.
    Request,
    /// `Response` or `LogoutResponse`.
    Response,
}

impl SamlMessageType {
    /// Returns the form or query parameter name for this message type.
    #[must_use]
    pub const fn param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Ordered query or form parameters accompanying a message.
pub type BindingParams = Vec<(String, String)>;

/// Parameters the bindings set themselves and never take from callers.
const RESERVED: [&str; 4] = ["SAMLRequest", "SAMLResponse", "SigAlg", "Signature"];

/// Merges parameter layers, later layers overriding earlier ones.
///
/// A non-empty `relay_state` goes first. Overridden keys keep their
/// original position.
#[must_use]
pub fn merge_params(relay_state: Option<&str>, layers: &[&BTreeMap<String, String>]) -> BindingParams {
    let mut merged: BindingParams = Vec::new();
    if let Some(relay_state) = relay_state.filter(|r| !r.is_empty()) {
        merged.push(("RelayState".to_string(), relay_state.to_string()));
    }
    for layer in layers {
        for (key, value) in *layer {
            match merged.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1.clone_from(value),
                None => merged.push((key.clone(), value.clone())),
            }
        }
    }
    merged
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
