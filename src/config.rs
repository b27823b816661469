//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Deployment variables (HOST, PORT, ACR_ACCESS_KEY, ACR_SECRET_KEY)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **impl blocks**: Add methods to structs
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Deployment variables (PORT, ACR_ACCESS_KEY, ...)
//! 2. Environment variables (APP_SERVER__PORT, APP_CORS__ALLOWED_ORIGINS, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! The configuration is loaded once at startup and is read-only afterwards.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each group maps to one `[section]` of config.toml, so the file reads the same
/// way the struct does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub provider: ProviderConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Browser origins that may call the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Recognition provider endpoint and credentials.
///
/// ## Fields:
/// - `base_url`: Scheme and host of the identify API, without the endpoint path
/// - `access_key`: Public key sent with every request and included in the signature
/// - `secret_key`: HMAC key, never sent over the wire and never logged
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub access_key: String,
    pub secret_key: String,
}

// Hand-written so credentials never end up in debug logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Host part of `base_url`, used for diagnostics.
    pub fn host(&self) -> &str {
        let without_scheme = self
            .base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url);
        without_scheme.split('/').next().unwrap_or(without_scheme)
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// The server can start with nothing but the two credentials set in the environment.
/// Credentials default to empty strings and are rejected by `validate`.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            cors: CorsConfig {
                allowed_origins: vec![
                    "http://localhost:5173".to_string(),
                    "http://localhost:3000".to_string(),
                ],
            },
            provider: ProviderConfig {
                base_url: "https://identify-eu-west-1.acrcloud.com".to_string(),
                access_key: String::new(),
                secret_key: String::new(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the deployment variables HOST, PORT, ACR_ACCESS_KEY and ACR_SECRET_KEY
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_CORS__ALLOWED_ORIGINS=https://a.example,https://b.example`: Replace the origin list
    /// - `APP_PROVIDER__BASE_URL=https://identify-us-west-2.acrcloud.com`: Use another region
    /// - `ACR_ACCESS_KEY=...` / `ACR_SECRET_KEY=...`: Provider credentials
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Double underscore separates sections so single underscores stay in field names
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(access_key) = env::var("ACR_ACCESS_KEY") {
            settings = settings.set_override("provider.access_key", access_key)?;
        }

        if let Ok(secret_key) = env::var("ACR_SECRET_KEY") {
            settings = settings.set_override("provider.secret_key", secret_key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - At least one CORS origin is configured
    /// - The provider URL has an http(s) scheme
    /// - Both provider credentials are present
    ///
    /// ## Why validate:
    /// A missing secret would otherwise only show up as a signature failure on the
    /// first recognition request.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(anyhow::anyhow!("At least one allowed CORS origin is required"));
        }

        if !(self.provider.base_url.starts_with("https://")
            || self.provider.base_url.starts_with("http://"))
        {
            return Err(anyhow::anyhow!(
                "Provider base URL must start with http:// or https://, got '{}'",
                self.provider.base_url
            ));
        }

        if self.provider.access_key.trim().is_empty() {
            return Err(anyhow::anyhow!("Provider access key is not set (ACR_ACCESS_KEY)"));
        }

        if self.provider.secret_key.trim().is_empty() {
            return Err(anyhow::anyhow!("Provider secret key is not set (ACR_SECRET_KEY)"));
        }

        Ok(())
    }
}
