//! API route definitions
//!
//! All JSON endpoints live under `/api/v1`; `/health` is also served at
//! the root for load balancers.

use axum::routing::{delete, get, post, put};
use axum::Router;

use super::handlers::{self, DashboardState};

/// Create all `/api/v1` routes.
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/aqi", get(handlers::get_aqi))
        .route("/search", get(handlers::search_places))
        // Locations (static segments before the parameterized ones)
        .route("/locations", get(handlers::list_locations).post(handlers::add_location))
        .route("/locations/refresh", post(handlers::refresh_locations))
        .route("/locations/swipe", post(handlers::swipe_location))
        .route("/locations/:index", delete(handlers::remove_location))
        .route("/locations/:index/select", post(handlers::select_location))
        // Alarms
        .route("/alarms", get(handlers::list_alarms).post(handlers::create_alarm))
        .route("/alarms/ringing", get(handlers::get_ringing))
        .route("/alarms/stop", post(handlers::stop_alarm))
        .route("/alarms/snooze", post(handlers::snooze_alarm))
        .route("/alarms/:id", put(handlers::update_alarm).delete(handlers::delete_alarm))
        .route("/alarms/:id/toggle", post(handlers::toggle_alarm))
        // Settings and config
        .route("/settings", get(handlers::get_settings).post(handlers::update_settings))
        .route("/config", get(handlers::get_config))
        .with_state(state)
}

/// Health endpoint at root level
pub fn legacy_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::legacy_health_check))
        .with_state(state)
}
