//! Configuration management for the Farm Advisor server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FARM_ prefix

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

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Log output configuration
    pub logging: LoggingConfig,

    /// Weather API configuration
    pub weather: WeatherConfig,

    /// Geocoding API configuration
    pub geocoding: GeocodingConfig,

    /// Soil data API configuration
    pub soil: SoilConfig,

    /// Email and push delivery configuration
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

/// Log line format
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Retry policy for outbound HTTP calls
#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the first retry, doubled on each subsequent retry
    pub initial_backoff_ms: u64,

    /// Upper bound on any single delay
    pub max_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Weather API base URL (OpenWeatherMap compatible)
    pub api_endpoint: String,

    /// Weather API key
    pub api_key: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    pub retry: RetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    /// Nominatim-compatible search endpoint
    pub api_endpoint: String,

    /// User agent sent with each request
    pub user_agent: String,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SoilConfig {
    /// SoilGrids-compatible properties endpoint
    pub api_endpoint: String,

    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationsConfig {
    /// HTTP email API endpoint; email is skipped when empty
    pub email_endpoint: String,

    pub email_api_key: String,

    /// Sender address for alert emails
    pub from_email: String,

    /// Push (FCM) HTTP endpoint; push is skipped when empty
    pub push_endpoint: String,

    pub push_server_key: String,

    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("FARM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("logging.format", "pretty")?
            .set_default("weather.api_endpoint", "https://api.openweathermap.org/data/2.5")?
            .set_default("weather.api_key", "")?
            .set_default("weather.timeout_secs", 10)?
            .set_default("weather.retry.max_attempts", 3)?
            .set_default("weather.retry.initial_backoff_ms", 200)?
            .set_default("weather.retry.max_backoff_ms", 2000)?
            .set_default(
                "geocoding.api_endpoint",
                "https://nominatim.openstreetmap.org/search",
            )?
            .set_default("geocoding.user_agent", "farm-advisor/0.1")?
            .set_default("geocoding.timeout_secs", 10)?
            .set_default(
                "soil.api_endpoint",
                "https://rest.isric.org/soilgrids/v2.0/properties/query",
            )?
            .set_default("soil.timeout_secs", 10)?
            .set_default("notifications.email_endpoint", "")?
            .set_default("notifications.email_api_key", "")?
            .set_default("notifications.from_email", "alerts@farm-advisor.local")?
            .set_default("notifications.push_endpoint", "")?
            .set_default("notifications.push_server_key", "")?
            .set_default("notifications.timeout_secs", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FARM_ prefix)
            .add_source(
                Environment::with_prefix("FARM")
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
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
