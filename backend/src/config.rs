//! Configuration management for the image tagging service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with IMGTAG_ prefix

use std::path::PathBuf;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Imagga tagging provider configuration
    pub imagga: ImaggaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; images are kept in memory when unset
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Deserialize, Clone)]
pub struct ImaggaConfig {
    /// API key
    pub api_key: String,

    /// API secret
    pub api_secret: String,

    /// Tags endpoint
    pub tags_endpoint: String,

    /// Uploads endpoint
    pub uploads_endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Directory for staging uploaded bytes; OS temp dir when unset
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ImaggaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImaggaConfig")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("tags_endpoint", &self.tags_endpoint)
            .field("uploads_endpoint", &self.uploads_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

pub const DEFAULT_TAGS_ENDPOINT: &str = "https://api.imagga.com/v2/tags";
pub const DEFAULT_UPLOADS_ENDPOINT: &str = "https://api.imagga.com/v2/uploads";

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("IMGTAG_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.max_upload_bytes", 10 * 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("imagga.tags_endpoint", DEFAULT_TAGS_ENDPOINT)?
            .set_default("imagga.uploads_endpoint", DEFAULT_UPLOADS_ENDPOINT)?
            .set_default("imagga.timeout_secs", 30)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (IMGTAG_ prefix)
            .add_source(
                Environment::with_prefix("IMGTAG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 2,
        }
    }
}

#[cfg(test)]
impl ImaggaConfig {
    /// Config with default endpoints for the given credentials
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            tags_endpoint: DEFAULT_TAGS_ENDPOINT.to_string(),
            uploads_endpoint: DEFAULT_UPLOADS_ENDPOINT.to_string(),
            timeout_secs: 30,
            staging_dir: None,
        }
    }
}
