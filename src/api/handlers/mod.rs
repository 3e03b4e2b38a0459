//! API route handlers
//!
//! - Health, dashboard, AQI conversion and config
//! - Location search, add/remove, selection and refresh
//! - Alarm CRUD plus the ringing / stop / snooze flow
//! - Display settings

mod alarms;
mod locations;
mod settings;
mod status;

pub use alarms::*;
pub use locations::*;
pub use settings::*;
pub use status::*;

use std::sync::Arc;

use crate::provider::DataProvider;
use crate::service::SharedSession;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Alarms, locations, settings and the alarm clock
    pub session: SharedSession,
    /// Geocoding and air-quality source
    pub provider: Arc<dyn DataProvider>,
    /// Bars in each dashboard forecast strip
    pub forecast_hours: usize,
}

impl DashboardState {
    pub fn new(session: SharedSession, provider: Arc<dyn DataProvider>, forecast_hours: usize) -> Self {
        Self {
            session,
            provider,
            forecast_hours,
        }
    }
}
