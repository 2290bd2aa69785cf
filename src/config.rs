use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::core::distance::DEFAULT_THRESHOLD_MILES;

/// Errors in configuration or in the static data a run depends on
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Distance threshold must be a positive finite number of miles, got {0}")]
    InvalidThreshold(f64),

    #[error("Worker pool size must be at least 1")]
    InvalidConcurrency,

    #[error("Provider timeout must be at least one second")]
    InvalidTimeout,

    #[error("Cannot read study roster {path}: {reason}")]
    RosterUnreadable { path: String, reason: String },

    #[error("Cannot read participant feed {path}: {reason}")]
    ParticipantsUnreadable { path: String, reason: String },

    #[error("Study roster contains no sites")]
    EmptyRoster,

    #[error("Invalid study site on row {row}: {reason}")]
    InvalidSite { row: usize, reason: String },

    #[error("Failed to build provider client: {0}")]
    Client(String),
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub geocoding: GeocodingSettings,
    pub routing: RoutingSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    pub feeds: FeedSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub delivery: DeliverySettings,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingSettings {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    pub endpoint: String,
    #[serde(default = "default_routing_profile")]
    pub profile: String,
}

fn default_routing_profile() -> String { "driving".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    pub threshold_miles: Option<f64>,
    pub max_concurrency: Option<usize>,
    pub provider_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    pub participants_path: String,
    pub roster_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub geocode_capacity: Option<u64>,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySettings {
    pub endpoint: String,
    pub api_key: String,
    pub from_email: String,
    pub template_id: String,
    pub support_contact: String,
    pub alert_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

fn default_report_dir() -> String { "logs".to_string() }

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Validated matching parameters shared read-only by every participant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    pub threshold_miles: f64,
    pub max_concurrency: usize,
    pub provider_timeout: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold_miles: DEFAULT_THRESHOLD_MILES,
            max_concurrency: 4,
            provider_timeout: Duration::from_secs(10),
        }
    }
}

impl MatchConfig {
    pub fn new(
        threshold_miles: f64,
        max_concurrency: usize,
        provider_timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        if !threshold_miles.is_finite() || threshold_miles <= 0.0 {
            return Err(ConfigurationError::InvalidThreshold(threshold_miles));
        }
        if max_concurrency == 0 {
            return Err(ConfigurationError::InvalidConcurrency);
        }
        if provider_timeout < Duration::from_secs(1) {
            return Err(ConfigurationError::InvalidTimeout);
        }
        Ok(Self {
            threshold_miles,
            max_concurrency,
            provider_timeout,
        })
    }
}

impl MatchingSettings {
    /// Apply defaults and validate
    pub fn match_config(&self) -> Result<MatchConfig, ConfigurationError> {
        let defaults = MatchConfig::default();
        MatchConfig::new(
            self.threshold_miles.unwrap_or(defaults.threshold_miles),
            self.max_concurrency.unwrap_or(defaults.max_concurrency),
            self.provider_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
        )
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Configuration file (config/default.toml)
    /// 2. Local overrides (config/local.toml)
    /// 3. Environment variables (prefixed with TRIAL_MATCH)
    /// 4. Provider keys from MAPQUEST_API_KEY / SENDGRID_API_KEY
    pub fn load() -> Result<Self, ConfigurationError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., TRIAL_MATCH__MATCHING__THRESHOLD_MILES -> matching.threshold_miles
            .add_source(
                Environment::with_prefix("TRIAL_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_provider_keys(settings)?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TRIAL_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Let the conventional provider key variables override file values
fn substitute_provider_keys(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(key) = env::var("MAPQUEST_API_KEY") {
        builder = builder.set_override("geocoding.api_key", key)?;
    }
    if let Ok(key) = env::var("SENDGRID_API_KEY") {
        builder = builder.set_override("delivery.api_key", key)?;
    }

    builder.build()
}
