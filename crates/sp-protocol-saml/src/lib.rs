//! SAML 2.0 service provider.
//!
//! This crate implements the service provider side of Web Browser SSO and
//! Single Logout:
//!
//! - **Request building** - `AuthnRequest`, `LogoutRequest` and
//!   `LogoutResponse` messages on the redirect or POST binding
//! - **Response validation** - XML signatures, encrypted assertions,
//!   validity windows, audience restrictions and `InResponseTo` replay
//!   protection
//! - **Single Logout** - IdP-initiated requests and responses on both bindings
//! - **Metadata** - the SP `EntityDescriptor` advertising keys and endpoints
//!
//! # Architecture
//!
//! - [`service`] - [`ServiceProvider`], the entry point applications use
//! - [`request`] / [`response`] / [`logout`] - message building and validation
//! - [`signature`] / [`xmlenc`] - XML-DSig and XML Encryption
//! - [`bindings`] - POST and Redirect binding encodings
//! - [`xml`] - parsing helpers, a writer and canonicalization
//! - [`config`] / [`credentials`] - settings and parsed key material
//!
//! # Example
//!
//! ```rust,ignore
//! use sp_protocol_saml::{SamlConfig, ServiceProvider};
//!
//! let config = SamlConfig::new("https://idp.example.com/sso", "https://sp.example.com")
//!     .with_idp_cert(idp_cert_pem)
//!     .with_callback_url("https://sp.example.com/saml/consume");
//! let sp = ServiceProvider::new(config)?;
//!
//! let url = sp.authorize_url(Some("/dashboard"), None, &Default::default()).await?;
//! // ... later, on the assertion consumer endpoint:
//! let outcome = sp.validate_post_response(&form["SAMLResponse"]).await?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Profiles](https://docs.oasis-open.org/security/saml/v2.0/saml-profiles-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)
//! - [XML Encryption](https://www.w3.org/TR/xmlenc-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logout;
pub mod metadata;
pub mod request;
pub mod response;
pub mod service;
pub mod signature;
pub mod types;
pub mod xml;
pub mod xmlenc;

#[cfg(test)]
mod fixtures;

pub use config::SamlConfig;
pub use credentials::{CertificateProvider, Credentials, StaticCertificates};
pub use error::{SamlError, SamlResult};
pub use request::RequestBuilder;
pub use response::ResponseValidator;
pub use service::{Clock, ServiceProvider};
pub use types::*;
