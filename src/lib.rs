//! airwatch: air-quality dashboard with threshold alarms
//!
//! ## Layout
//!
//! - **aqi**: PM2.5 breakpoint tables and index conversion for four national standards
//! - **alarm**: alarm model, condition evaluation, scheduling, ringing and snooze
//! - **location**: tracked cities with current readings and hourly series
//! - **provider**: geocoding and air-quality sources (Open-Meteo)
//! - **state**: session state and the dashboard view model
//! - **service**: background tasks (alarm tick, refresh, bootstrap)
//! - **api**: axum HTTP surface

pub mod alarm;
pub mod api;
pub mod aqi;
pub mod config;
pub mod location;
pub mod provider;
pub mod service;
pub mod state;

pub use alarm::{Alarm, AlarmClock, AlarmDraft, Condition, Metric, Operator};
pub use aqi::{calculate_index, Reading, Standard};
pub use config::AppConfig;
pub use location::Location;
pub use state::{AppState, Session};
