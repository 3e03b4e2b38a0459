//! Service Configuration
//!
//! Provider endpoints, dashboard defaults, and alarm timing loaded from
//! TOML.
//!
//! ## Loading Order
//!
//! 1. `AIRWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `airwatch.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(AppConfig::load());
//!
//! // Anywhere else:
//! let tick = config::get().alarms.tick_millis;
//! ```

mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored.
pub fn init(config: AppConfig) {
    if APP_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// The global configuration.
///
/// Falls back to built-in defaults if `init()` was never called.
pub fn get() -> &'static AppConfig {
    APP_CONFIG.get_or_init(|| {
        tracing::warn!("config::get() called before config::init(), using defaults");
        AppConfig::default()
    })
}

pub fn is_initialized() -> bool {
    APP_CONFIG.get().is_some()
}
