//! Alarm endpoints: CRUD, toggle, and the ringing / stop / snooze flow

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::alarm::{AlarmDraft, ClockState, RingEvent};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};

use super::DashboardState;

/// GET /api/v1/alarms
pub async fn list_alarms(State(state): State<DashboardState>) -> Response {
    let session = state.session.read().await;
    ApiResponse::ok(session.app.alarms().to_vec())
}

/// POST /api/v1/alarms
pub async fn create_alarm(
    State(state): State<DashboardState>,
    Json(draft): Json<AlarmDraft>,
) -> Response {
    let mut session = state.session.write().await;
    match session.app.add_alarm(draft) {
        Ok(alarm) => ApiResponse::created(alarm),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

/// PUT /api/v1/alarms/:id - replace an alarm's settings (reactivates it)
pub async fn update_alarm(
    State(state): State<DashboardState>,
    Path(id): Path<u64>,
    Json(draft): Json<AlarmDraft>,
) -> Response {
    let mut session = state.session.write().await;
    match session.app.update_alarm(id, draft) {
        Ok(alarm) => ApiResponse::ok(alarm),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

/// DELETE /api/v1/alarms/:id
pub async fn delete_alarm(State(state): State<DashboardState>, Path(id): Path<u64>) -> Response {
    let mut session = state.session.write().await;
    match session.app.delete_alarm(id) {
        Ok(alarm) => ApiResponse::ok(alarm),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: u64,
    pub active: bool,
}

/// POST /api/v1/alarms/:id/toggle
pub async fn toggle_alarm(State(state): State<DashboardState>, Path(id): Path<u64>) -> Response {
    let mut session = state.session.write().await;
    match session.app.toggle_alarm(id) {
        Ok(active) => ApiResponse::ok(ToggleResponse { id, active }),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

// ============================================================================
// Ringing
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RingingResponse {
    pub clock: ClockState,
    /// Rings waiting behind the current one
    pub queued: Vec<RingEvent>,
}

/// GET /api/v1/alarms/ringing
pub async fn get_ringing(State(state): State<DashboardState>) -> Response {
    let session = state.session.read().await;
    ApiResponse::ok(RingingResponse {
        clock: session.clock.state().clone(),
        queued: session.clock.pending().cloned().collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: Option<RingEvent>,
    pub clock: ClockState,
}

/// POST /api/v1/alarms/stop - silence the ringing alarm
pub async fn stop_alarm(State(state): State<DashboardState>) -> Response {
    let mut session = state.session.write().await;
    let stopped = session.stop();
    ApiResponse::ok(StopResponse {
        stopped,
        clock: session.clock.state().clone(),
    })
}

/// POST /api/v1/alarms/snooze - schedule a one-shot repeat and silence
pub async fn snooze_alarm(State(state): State<DashboardState>) -> Response {
    let mut session = state.session.write().await;
    match session.snooze(Utc::now()) {
        Ok(alarm) => ApiResponse::created(alarm),
        Err(e) => ApiErrorResponse::from_snooze(&e),
    }
}
