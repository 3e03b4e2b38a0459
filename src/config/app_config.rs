//! Service configuration loaded from `airwatch.toml`.
//!
//! Every section and field has a default, so a partial file (or none at
//! all) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::aqi::Standard;
use crate::state::TimeFormat;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "AIRWATCH_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "airwatch.toml";

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-level
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// External data sources
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub alarms: AlarmsConfig,
}

impl AppConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AIRWATCH_CONFIG`
    /// 2. `./airwatch.toml`
    /// 3. Built-in defaults
    ///
    /// A file that fails to load is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {CONFIG_ENV}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV} points to a non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    ///
    /// Unknown keys are logged as warnings; range errors fail the load.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// [server]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address.
    ///
    /// Overridden by `AIRWATCH_SERVER_ADDR` or `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// [providers]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_air_quality_url")]
    pub air_quality_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocoding_url() -> String {
    defaults::GEOCODING_URL.to_string()
}
fn default_air_quality_url() -> String {
    defaults::AIR_QUALITY_URL.to_string()
}
fn default_weather_url() -> String {
    defaults::WEATHER_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    defaults::PROVIDER_TIMEOUT_SECS
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            air_quality_url: default_air_quality_url(),
            weather_url: default_weather_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ============================================================================
// [dashboard]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// City added as the current location at startup. Empty disables it.
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Initial AQI standard
    #[serde(default)]
    pub standard: Standard,

    /// Initial forecast label style ("24h" or "12h")
    #[serde(default)]
    pub time_format: TimeFormat,

    #[serde(default = "default_forecast_hours")]
    pub forecast_hours: usize,

    /// Seconds between location refreshes; 0 disables refreshing
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_refresh_jitter_secs")]
    pub refresh_jitter_secs: u64,
}

fn default_city() -> String {
    defaults::DEFAULT_CITY.to_string()
}
fn default_forecast_hours() -> usize {
    defaults::FORECAST_HOURS
}
fn default_refresh_interval_secs() -> u64 {
    defaults::REFRESH_INTERVAL_SECS
}
fn default_refresh_jitter_secs() -> u64 {
    defaults::REFRESH_JITTER_SECS
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_city: default_city(),
            standard: Standard::default(),
            time_format: TimeFormat::default(),
            forecast_hours: default_forecast_hours(),
            refresh_interval_secs: default_refresh_interval_secs(),
            refresh_jitter_secs: default_refresh_jitter_secs(),
        }
    }
}

// ============================================================================
// [alarms]
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmsConfig {
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    #[serde(default = "default_missed_fire_grace_secs")]
    pub missed_fire_grace_secs: u32,

    #[serde(default = "default_sound")]
    pub default_sound: String,

    #[serde(default = "default_snooze_minutes")]
    pub default_snooze_minutes: u32,
}

fn default_tick_millis() -> u64 {
    defaults::ALARM_TICK_MILLIS
}
fn default_missed_fire_grace_secs() -> u32 {
    defaults::MISSED_FIRE_GRACE_SECS
}
fn default_sound() -> String {
    defaults::DEFAULT_ALARM_SOUND.to_string()
}
fn default_snooze_minutes() -> u32 {
    defaults::DEFAULT_SNOOZE_MINUTES
}

impl Default for AlarmsConfig {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
            missed_fire_grace_secs: default_missed_fire_grace_secs(),
            default_sound: default_sound(),
            default_snooze_minutes: default_snooze_minutes(),
        }
    }
}
