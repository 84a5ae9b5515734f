use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";

/// Application configuration, layered from defaults, an optional
/// `config/{environment}.toml` file, and `APP__`-prefixed environment
/// variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL.
    #[validate(length(min = 1, message = "Database URL must not be empty"))]
    pub database_url: String,

    /// Runtime environment name: "development", "test", or "production".
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log filter passed to the tracing subscriber.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,

    /// Emit SQL statements at debug level.
    #[serde(default)]
    pub db_query_logging: bool,

    /// Create missing tables from the entity schema on startup. Intended for
    /// development and embedded SQLite deployments.
    #[serde(default)]
    pub auto_migrate: bool,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

impl AppConfig {
    /// Builds a configuration with explicit values, used by tests and
    /// embedding binaries.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: environment.into(),
            log_level: default_log_level(),
            db_max_connections: default_max_connections(),
            db_min_connections: default_min_connections(),
            db_query_logging: false,
            auto_migrate: false,
        }
    }

    /// Loads configuration from the layered sources and validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let file_path = format!("{}/{}", CONFIG_DIR, environment);

        let mut builder = Config::builder()
            .set_default("environment", environment.as_str())?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?;

        if Path::new(CONFIG_DIR).is_dir() {
            builder = builder.add_source(File::with_name(&file_path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        info!(environment = %config.environment, "configuration loaded");
        Ok(config)
    }
}
