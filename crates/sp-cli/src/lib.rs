//! # sp-cli
//!
//! Command line tool for the SAML service provider.
//!
//! The `saml-sp` binary drives a [`ServiceProvider`](sp_protocol_saml::ServiceProvider)
//! configured from a TOML file:
//! - Print SP metadata
//! - Build authorize URLs and forms, and logout URLs
//! - Decode encoded SAML messages
//! - Validate a posted SAML response

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
