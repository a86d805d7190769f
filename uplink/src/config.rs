//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `UPLINK_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `UPLINK_` override YAML values
//! 3. **Well-known variables** - `AUTH_SECRET`, `BLOB_READ_WRITE_TOKEN`, `OPENAI_API_KEY` and
//!    `GOOGLE_GENERATIVE_AI_API_KEY` are honored without a prefix so the service can share an
//!    environment with the chat frontend it backs
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `UPLINK_AUTH__SECURITY__JWT_EXPIRY=2h` sets the `auth.security.jwt_expiry` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use uplink::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Parse CLI arguments
//! let args = Args::parse();
//!
//! // Load configuration from file and environment
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Structure
//!
//! The configuration file is structured in YAML format. See the repository's `config.yaml` for a
//! complete example with all available options. Key sections include:
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Security**: `secret_key`, `auth.security` - Session verification and CORS settings
//! - **Storage**: `storage.provider`, `storage.token` - Blob store used for file uploads
//! - **Providers**: `providers.google`, `providers.openai` - Hosted model endpoints and keys
//! - **Features**: `enable_otel_export` - Optional feature toggles
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! UPLINK_PORT=8080
//!
//! # Session signing secret shared with the frontend auth layer
//! AUTH_SECRET="..."
//!
//! # Read-write store token (selects the managed storage provider)
//! BLOB_READ_WRITE_TOKEN="blob_rw_store123_..."
//!
//! # Override nested values
//! UPLINK_AUTH__SESSION__COOKIE_NAME=session
//! UPLINK_ENABLE_OTEL_EXPORT=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "UPLINK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Secret key for session token verification, shared with the frontend auth layer
    pub secret_key: Option<String>,
    /// Optional: secret key override via the unprefixed AUTH_SECRET environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
    /// Optional: store token override via the unprefixed BLOB_READ_WRITE_TOKEN environment
    /// variable. When set, the managed storage provider is selected automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_read_write_token: Option<String>,
    /// Optional: OpenAI API key override via the unprefixed OPENAI_API_KEY environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    /// Optional: Google API key override via the unprefixed GOOGLE_GENERATIVE_AI_API_KEY
    /// environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_generative_ai_api_key: Option<String>,
    /// Blob storage configuration for file uploads
    pub storage: StorageConfig,
    /// Hosted model provider endpoints and credentials
    pub providers: ProvidersConfig,
    /// Authentication configuration (session cookie, JWT, CORS)
    pub auth: AuthConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Blob storage configuration.
///
/// Uploads are brokered through a managed blob store: clients ask this service for a scoped
/// client token, upload directly to the store, and the store calls back here when the upload
/// completes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Managed blob store with locally signed client tokens
    Managed {
        /// Read-write store token of the form `blob_rw_<store_id>_<secret>`
        token: String,
        /// Override for the upload-completed callback URL. When absent, the callback URL
        /// supplied by the uploading client is used. Useful behind tunnels and proxies where
        /// the client-visible URL is not reachable from the store.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        callback_url: Option<Url>,
    },
    /// In-process stub that grants unsigned tokens and accepts every callback.
    /// For development and tests only.
    Dummy,
}

/// Hosted model provider endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Google models, reached through Google's OpenAI-compatible endpoint
    pub google: ProviderEndpoint,
    /// OpenAI models (used for image generation)
    pub openai: ProviderEndpoint,
}

/// A single OpenAI-compatible provider endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEndpoint {
    /// Base URL of the OpenAI-compatible API (without the trailing route segment)
    pub base_url: Url,
    /// API key sent as a bearer token. Optional so local gateways without auth work.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Session cookie configuration
    pub session: SessionConfig,
    /// Security settings (JWT, CORS)
    pub security: SecurityConfig,
}

/// Session cookie configuration.
///
/// Sessions are created by the frontend auth layer; this service only verifies them, so the
/// only cookie detail it needs is the name to look for.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name carrying the session token
    pub cookie_name: String,
}

/// Security configuration for JWT and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// JWT token expiry duration
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// A single allowed CORS origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            secret_key: None,
            auth_secret: None,
            blob_read_write_token: None,
            openai_api_key: None,
            google_generative_ai_api_key: None,
            storage: StorageConfig::default(),
            providers: ProvidersConfig::default(),
            auth: AuthConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Dummy
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google: ProviderEndpoint {
                base_url: Url::parse("https://generativelanguage.googleapis.com/v1beta/openai").unwrap(),
                api_key: None,
            },
            openai: ProviderEndpoint {
                base_url: Url::parse("https://api.openai.com/v1").unwrap(),
                api_key: None,
            },
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "uplink_session".to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_expiry: Duration::from_secs(24 * 60 * 60), // 24 hours
            cors: CorsConfig::default(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                CorsOrigin::Url(Url::parse("http://localhost:3000").unwrap()), // Development frontend (Next.js)
            ],
            allow_credentials: true,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // Fold the unprefixed frontend-environment variables into their proper homes
        if let Some(secret) = config.auth_secret.take() {
            config.secret_key = Some(secret);
        }
        if let Some(token) = config.blob_read_write_token.take() {
            // A store token implies the managed provider; keep an explicitly configured
            // callback_url if one was set
            let callback_url = match &config.storage {
                StorageConfig::Managed { callback_url, .. } => callback_url.clone(),
                StorageConfig::Dummy => None,
            };
            config.storage = StorageConfig::Managed { token, callback_url };
        }
        if let Some(key) = config.openai_api_key.take() {
            config.providers.openai.api_key = Some(key);
        }
        if let Some(key) = config.google_generative_ai_api_key.take() {
            config.providers.google.api_key = Some(key);
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: Session verification requires a secret_key. \
                     Please set the AUTH_SECRET or UPLINK_SECRET_KEY environment variable or add secret_key to config file."
                    .to_string(),
            });
        }

        // Validate JWT expiry duration is reasonable
        if self.auth.security.jwt_expiry.as_secs() < 300 {
            // Less than 5 minutes
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too short (minimum 5 minutes)".to_string(),
            });
        }

        if self.auth.security.jwt_expiry.as_secs() > 86400 * 30 {
            // More than 30 days
            return Err(Error::Internal {
                operation: "Config validation: JWT expiry duration is too long (maximum 30 days)".to_string(),
            });
        }

        // Validate CORS configuration
        if self.auth.security.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        // Validate that wildcard is not used with credentials
        let has_wildcard = self
            .auth
            .security
            .cors
            .allowed_origins
            .iter()
            .any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.auth.security.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        // Validate the store token shape before the storage provider ever signs with it
        if let StorageConfig::Managed { token, .. } = &self.storage {
            let well_formed = matches!(
                token.strip_prefix("blob_rw_").and_then(|rest| rest.split_once('_')),
                Some((store_id, secret)) if !store_id.is_empty() && !secret.is_empty()
            );
            if !well_formed {
                return Err(Error::Internal {
                    operation: "Config validation: storage.token must be a read-write store token of the form blob_rw_<store_id>_<secret>."
                        .to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("UPLINK_").split("__"))
            // Well-known variables shared with the chat frontend's environment
            .merge(Env::raw().only(&[
                "AUTH_SECRET",
                "BLOB_READ_WRITE_TOKEN",
                "OPENAI_API_KEY",
                "GOOGLE_GENERATIVE_AI_API_KEY",
            ]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
