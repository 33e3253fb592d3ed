//! Redis connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sp_cache::{CacheError, CacheResult};

/// Where and how the replay cache reaches Redis.
///
/// Either a full `url` or the individual `host`/`port`/`database` parts;
/// the URL wins when both are given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Full connection URL, e.g. `rediss://:secret@cache:6380/2`.
    #[serde(default)]
    pub url: Option<String>,
    /// Redis server host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Redis server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Password for `AUTH`.
    #[serde(default)]
    pub password: Option<String>,
    /// Logical database holding the request IDs.
    #[serde(default)]
    pub database: u8,
    /// Connect with TLS (`rediss://`).
    #[serde(default)]
    pub tls: bool,
    /// Time allowed for the initial connection, in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Time allowed for each command, in milliseconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
    /// Namespace for request ID keys; service providers sharing a Redis
    /// instance need distinct prefixes.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_host(),
            port: default_port(),
            password: None,
            database: 0,
            tls: false,
            connect_timeout_ms: default_connect_timeout(),
            command_timeout_ms: default_command_timeout(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl RedisConfig {
    /// Configuration connecting to `url`.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Sets the host and port.
    #[must_use]
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Selects the logical database and TLS.
    #[must_use]
    pub const fn with_database(mut self, database: u8, tls: bool) -> Self {
        self.database = database;
        self.tls = tls;
        self
    }

    /// Sets the request ID key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// The URL handed to the client.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let scheme = if self.tls { "rediss" } else { "redis" };
        let auth = self
            .password
            .as_ref()
            .map(|p| format!(":{p}@"))
            .unwrap_or_default();
        format!(
            "{scheme}://{auth}{host}:{port}/{db}",
            host = self.host,
            port = self.port,
            db = self.database
        )
    }

    /// Redis key under which request `id` is stored.
    #[must_use]
    pub fn request_key(&self, id: &str) -> String {
        if self.key_prefix.is_empty() {
            id.to_string()
        } else {
            format!("{}:{id}", self.key_prefix)
        }
    }

    /// Rejects settings the client would only fail on later.
    ///
    /// ## Errors
    ///
    /// Returns [`CacheError::Configuration`] for zero timeouts or a key
    /// prefix containing whitespace.
    pub fn validate(&self) -> CacheResult<()> {
        if self.connect_timeout_ms == 0 || self.command_timeout_ms == 0 {
            return Err(CacheError::Configuration("timeouts must be positive".to_string()));
        }
        if self.key_prefix.chars().any(char::is_whitespace) {
            return Err(CacheError::Configuration(format!(
                "key prefix {:?} contains whitespace",
                self.key_prefix
            )));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    6379
}

const fn default_connect_timeout() -> u64 {
    5000
}

const fn default_command_timeout() -> u64 {
    2000
}

fn default_key_prefix() -> String {
    "saml:request".to_string()
}
