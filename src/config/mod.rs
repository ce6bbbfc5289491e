//! Application configuration.
//!
//! Loaded once at startup from an optional TOML file plus `AUTHD`-prefixed
//! environment variables (e.g. `AUTHD__AUTH__SECRET_KEY`), then passed by
//! reference. Nothing here is mutated after startup.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub oidc: OidcConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            oidc: OidcConfig::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8080`.
    pub listen: String,
    /// Allowed CORS origins. Empty disables cross-origin access.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string.
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://authd.db?mode=rwc".to_string(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Required; rotating it invalidates every
    /// outstanding token (no key versioning).
    pub secret_key: Option<String>,
    /// Access token lifetime in minutes.
    pub access_ttl_minutes: u64,
    /// Refresh token lifetime in days.
    pub refresh_ttl_days: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        }
    }
}

/// Google OIDC federation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OidcConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Secret signing the OAuth `state` parameter.
    pub state_secret: Option<String>,
}

impl OidcConfig {
    /// Whether federation is fully configured.
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
            && self.client_secret.is_some()
            && self.redirect_uri.is_some()
            && self.state_secret.is_some()
    }
}

impl AppConfig {
    /// Load configuration from an optional file plus environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(
                File::from(path).format(FileFormat::Toml).required(false),
            );
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("AUTHD")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("building configuration")?;

        settings
            .try_deserialize()
            .context("deserializing configuration")
    }

    /// Validate the configuration for serving.
    pub fn validate(&self) -> Result<()> {
        let secret = self
            .auth
            .secret_key
            .as_deref()
            .context("auth.secret_key is required (set AUTHD__AUTH__SECRET_KEY)")?;

        if secret.len() < 32 {
            anyhow::bail!("auth.secret_key must be at least 32 characters");
        }

        if self.auth.access_ttl_minutes == 0 {
            anyhow::bail!("auth.access_ttl_minutes must be greater than zero");
        }

        if self.auth.refresh_ttl_days == 0 {
            anyhow::bail!("auth.refresh_ttl_days must be greater than zero");
        }

        Ok(())
    }
}
