//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use keel_core::KeelError;
use std::path::Path;
use tracing::{debug, info, warn};

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Configuration loader with layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: AppConfig,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `KEEL__` prefix, e.g. `KEEL__DATABASE__URL`
    pub fn new(config_dir: impl Into<String>) -> Result<Self, KeelError> {
        let config = Self::load_config(&config_dir.into())?;
        Ok(Self { config })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, KeelError> {
        Self::new("./config")
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Consumes the loader, returning the loaded configuration.
    #[must_use]
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<AppConfig, KeelError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var("KEEL_ENV").unwrap_or_else(|_| "development".to_string());
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("KEEL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_keel_error)?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_keel_error)?;
        app_config.app.environment = environment;

        Self::validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Validates the configuration.
    pub fn validate_config(config: &AppConfig) -> Result<(), KeelError> {
        if config.app.environment == "production" && config.admin.password == "admin" {
            warn!("Using the default admin password in production! Change it after the first login.");
        }

        if config.database.url.is_empty() {
            return Err(KeelError::Configuration("Database URL is required".to_string()));
        }

        if config.database.max_connections == 0 {
            return Err(KeelError::Configuration(
                "database.max_connections must be greater than zero".to_string(),
            ));
        }

        if config.retry.max_attempts == 0 {
            return Err(KeelError::Configuration(
                "retry.max_attempts must be greater than zero".to_string(),
            ));
        }

        if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
            return Err(KeelError::Configuration(format!(
                "Unknown log format '{}', expected one of {:?}",
                config.observability.log_format, LOG_FORMATS
            )));
        }

        Ok(())
    }
}

fn config_error_to_keel_error(err: ConfigError) -> KeelError {
    KeelError::Configuration(err.to_string())
}
