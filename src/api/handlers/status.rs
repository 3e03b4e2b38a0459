//! Service state endpoints: health, dashboard, AQI conversion, config

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::aqi::{self, Reading, Standard};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};

use super::DashboardState;

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub locations: usize,
    pub alarms: usize,
    pub active_alarms: usize,
    pub ringing: bool,
}

/// GET /api/v1/health
pub async fn get_health(State(state): State<DashboardState>) -> Response {
    let session = state.session.read().await;
    let alarms = session.app.alarms();
    ApiResponse::ok(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: session.started_at.elapsed().as_secs(),
        locations: session.app.locations().len(),
        alarms: alarms.len(),
        active_alarms: alarms.iter().filter(|a| a.active).count(),
        ringing: session.clock.is_ringing(),
    })
}

/// GET /health - plain liveness probe for load balancers
pub async fn legacy_health_check(State(state): State<DashboardState>) -> Json<serde_json::Value> {
    let uptime = state.session.read().await.started_at.elapsed().as_secs();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime,
    }))
}

// ============================================================================
// Dashboard
// ============================================================================

/// GET /api/v1/dashboard - every slide with its forecast strip
pub async fn get_dashboard(State(state): State<DashboardState>) -> Response {
    let session = state.session.read().await;
    ApiResponse::ok(session.app.dashboard(Utc::now(), state.forecast_hours))
}

// ============================================================================
// AQI conversion
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AqiQuery {
    /// PM2.5 in µg/m³
    pub concentration: f64,
    /// Standard code; the session standard when absent
    pub standard: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AqiResponse {
    pub concentration: f64,
    #[serde(flatten)]
    pub reading: Reading,
    pub bar_height_percent: f64,
}

/// GET /api/v1/aqi?concentration=&standard=
pub async fn get_aqi(State(state): State<DashboardState>, Query(query): Query<AqiQuery>) -> Response {
    if !query.concentration.is_finite() {
        return ApiErrorResponse::bad_request("concentration must be a finite number");
    }

    let standard = match query.standard.as_deref() {
        Some(code) => Standard::parse_or_default(code),
        None => state.session.read().await.app.settings().standard,
    };
    let reading = Reading::from_concentration(query.concentration, standard);
    ApiResponse::ok(AqiResponse {
        concentration: query.concentration,
        bar_height_percent: aqi::bar_height_percent(reading.index, standard),
        reading,
    })
}

// ============================================================================
// Config
// ============================================================================

/// GET /api/v1/config - the active service configuration
pub async fn get_config() -> Response {
    match serde_json::to_value(crate::config::get()) {
        Ok(v) => ApiResponse::ok(v),
        Err(e) => ApiErrorResponse::internal(format!("Failed to serialize config: {e}")),
    }
}
