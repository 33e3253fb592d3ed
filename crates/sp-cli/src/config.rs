//! CLI configuration.
//!
//! The TOML file has a `[saml]` table holding a [`SamlConfig`], a `[files]`
//! table naming PEM files to load key material from, and an optional
//! `[redis]` table selecting a shared replay cache. `SAML_SP_*` environment
//! variables override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sp_cache_redis::RedisConfig;
use sp_protocol_saml::SamlConfig;
use tracing::debug;

use crate::{CliError, CliResult};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "saml-sp.toml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Service provider settings.
    #[serde(default)]
    pub saml: SamlConfig,

    /// Key material files, relative to the configuration file.
    #[serde(default)]
    pub files: KeyFiles,

    /// Shared replay cache; in-memory when unset.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

/// PEM files loaded into the matching [`SamlConfig`] fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyFiles {
    /// IdP signing certificates.
    #[serde(default)]
    pub idp_cert: Vec<PathBuf>,
    /// SP signing key.
    pub private_key: Option<PathBuf>,
    /// SP signing certificate.
    pub signing_cert: Option<PathBuf>,
    /// SP decryption key.
    pub decryption_pvk: Option<PathBuf>,
    /// SP decryption certificate.
    pub decryption_cert: Option<PathBuf>,
}

impl CliConfig {
    /// Loads `path`, applies environment overrides and reads key files.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> CliResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.read_key_files(base)?;
        Ok(config)
    }

    /// Parses a configuration document.
    pub fn from_toml(content: &str) -> CliResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `SAML_SP_*` overrides found through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let saml = &mut self.saml;
        if let Some(value) = lookup("SAML_SP_ENTRY_POINT") {
            saml.entry_point = value;
        }
        if let Some(value) = lookup("SAML_SP_ISSUER") {
            saml.issuer = value;
        }
        if let Some(value) = lookup("SAML_SP_IDP_ISSUER") {
            saml.idp_issuer = Some(value);
        }
        if let Some(value) = lookup("SAML_SP_CALLBACK_URL") {
            saml.callback_url = Some(value);
        }
        if let Some(value) = lookup("SAML_SP_LOGOUT_URL") {
            saml.logout_url = Some(value);
        }
        if let Some(value) = lookup("SAML_SP_LOGOUT_CALLBACK_URL") {
            saml.logout_callback_url = Some(value);
        }

        let files = &mut self.files;
        if let Some(value) = lookup("SAML_SP_IDP_CERT_FILE") {
            files.idp_cert = value.split(',').map(|p| PathBuf::from(p.trim())).collect();
        }
        if let Some(value) = lookup("SAML_SP_PRIVATE_KEY_FILE") {
            files.private_key = Some(value.into());
        }
        if let Some(value) = lookup("SAML_SP_SIGNING_CERT_FILE") {
            files.signing_cert = Some(value.into());
        }
        if let Some(value) = lookup("SAML_SP_DECRYPTION_PVK_FILE") {
            files.decryption_pvk = Some(value.into());
        }
        if let Some(value) = lookup("SAML_SP_DECRYPTION_CERT_FILE") {
            files.decryption_cert = Some(value.into());
        }

        if let Some(host) = lookup("SAML_SP_REDIS_HOST") {
            self.redis.get_or_insert_with(RedisConfig::default).host = host;
        }
    }

    fn read_key_files(&mut self, base: &Path) -> CliResult<()> {
        let read = |path: &PathBuf| -> CliResult<String> {
            let full = base.join(path);
            std::fs::read_to_string(&full).map_err(|source| CliError::KeyFile { path: full, source })
        };

        for path in &self.files.idp_cert {
            self.saml.idp_cert.push(read(path)?);
        }
        let files = &self.files;
        let saml = &mut self.saml;
        for (path, field) in [
            (&files.private_key, &mut saml.private_key),
            (&files.signing_cert, &mut saml.signing_cert),
            (&files.decryption_pvk, &mut saml.decryption_pvk),
            (&files.decryption_cert, &mut saml.decryption_cert),
        ] {
            if let Some(path) = path {
                *field = Some(read(path)?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DOC: &str = r#"
        [saml]
        entry_point = "https://idp.example.com/sso"
        issuer = "https://sp.example.com"
        validate_in_response_to = true

        [files]
        idp_cert = ["idp-cert.pem"]
        private_key = "sp-key.pem"

        [redis]
        host = "cache.internal"
    "#;

    #[test]
    fn parses_all_sections() {
        let config = CliConfig::from_toml(DOC).unwrap();
        assert_eq!(config.saml.entry_point, "https://idp.example.com/sso");
        assert!(config.saml.validate_in_response_to);
        assert_eq!(config.files.idp_cert, [PathBuf::from("idp-cert.pem")]);
        assert_eq!(config.redis.map(|r| r.host).as_deref(), Some("cache.internal"));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = CliConfig::from_toml(DOC).unwrap();
        let env = HashMap::from([
            ("SAML_SP_ISSUER", "https://other-sp.example.com"),
            ("SAML_SP_IDP_CERT_FILE", "a.pem, b.pem"),
        ]);
        config.apply_env(|name| env.get(name).map(|v| (*v).to_string()));
        assert_eq!(config.saml.issuer, "https://other-sp.example.com");
        assert_eq!(config.saml.entry_point, "https://idp.example.com/sso");
        assert_eq!(config.files.idp_cert, [PathBuf::from("a.pem"), PathBuf::from("b.pem")]);
    }

    #[test]
    fn key_files_resolve_relative_to_config() {
        let base = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata");
        let mut config = CliConfig::default();
        config.files.idp_cert = vec!["idp-cert.pem".into()];
        config.files.private_key = Some("sp-key.pem".into());
        config.read_key_files(&base).unwrap();
        assert!(config.saml.idp_cert[0].contains("BEGIN CERTIFICATE"));
        assert!(config.saml.private_key.is_some());

        config.files.decryption_pvk = Some("missing.pem".into());
        assert!(matches!(config.read_key_files(&base), Err(CliError::KeyFile { .. })));
    }

    #[test]
    fn empty_document_is_default() {
        let config = CliConfig::from_toml("").unwrap();
        assert!(config.redis.is_none());
        assert_eq!(config.saml, SamlConfig::default());
    }
}
