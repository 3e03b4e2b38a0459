//! Built-in default values.
//!
//! Every tunable in `airwatch.toml` falls back to one of these.

// ============================================================================
// Server
// ============================================================================

pub const SERVER_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// Providers (Open-Meteo)
// ============================================================================

pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// HTTP timeout for provider requests (seconds).
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Dashboard
// ============================================================================

/// City added as the current location at startup.
pub const DEFAULT_CITY: &str = "Shanghai";

/// Number of hourly bars in the forecast strip.
pub const FORECAST_HOURS: usize = 24;

/// How often every location is re-fetched (seconds). 900 = 15 minutes.
pub const REFRESH_INTERVAL_SECS: u64 = 900;

/// Random jitter added to each refresh interval (seconds).
pub const REFRESH_JITTER_SECS: u64 = 60;

// ============================================================================
// Alarms
// ============================================================================

/// Alarm tick period (milliseconds).
pub const ALARM_TICK_MILLIS: u64 = 1_000;

/// A fire this late (clock jump, suspended process) is skipped rather than
/// rung (seconds).
pub const MISSED_FIRE_GRACE_SECS: u32 = 120;

pub const DEFAULT_ALARM_SOUND: &str = "radar";

pub const DEFAULT_SNOOZE_MINUTES: u32 = 5;
