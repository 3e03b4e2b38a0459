//! Display settings endpoints

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::api::envelope::ApiResponse;
use crate::aqi::Standard;
use crate::state::TimeFormat;

use super::DashboardState;

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<DashboardState>) -> Response {
    ApiResponse::ok(state.session.read().await.app.settings())
}

/// Partial settings update. Missing fields keep their values.
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub standard: Option<Standard>,
    pub time_format: Option<TimeFormat>,
}

/// POST /api/v1/settings
pub async fn update_settings(
    State(state): State<DashboardState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Response {
    let mut session = state.session.write().await;
    if let Some(standard) = request.standard {
        if standard != session.app.settings().standard {
            session.app.set_standard(standard);
        }
    }
    if let Some(format) = request.time_format {
        session.app.set_time_format(format);
    }
    ApiResponse::ok(session.app.settings())
}
