//! Configuration management for the stock wizard client
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOCK_WIZARD_ prefix

use config::{Environment, File};
use serde::Deserialize;
use validator::Validate;

use crate::error::ClientError;

/// Main client configuration
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ClientConfig {
    /// Current environment (development, production)
    pub environment: String,

    /// Remote data service configuration
    #[validate]
    pub remote: RemoteConfig,

    /// Session defaults
    #[validate]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct RemoteConfig {
    /// GraphQL endpoint URL
    #[validate(url)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct SessionConfig {
    /// Default stock site
    #[validate(length(min = 1))]
    pub site: String,

    /// User the stored documents belong to
    #[validate(length(min = 1))]
    pub username: String,
}

impl ClientConfig {
    /// Load configuration from `.env`, files and environment variables
    pub fn load() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        let environment =
            std::env::var("STOCK_WIZARD_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("remote.timeout_secs", 30)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCK_WIZARD_ prefix)
            .add_source(
                Environment::with_prefix("STOCK_WIZARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already built configuration
    pub fn from_config(config: config::Config) -> Result<Self, ClientError> {
        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
