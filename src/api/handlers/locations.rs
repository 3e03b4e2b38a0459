//! Location endpoints: search, add, remove, select, swipe, refresh

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::location::Location;
use crate::provider;
use crate::service;
use crate::state::Swipe;

use super::DashboardState;

#[derive(Debug, Serialize)]
pub struct LocationList {
    pub selected: usize,
    pub locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
pub struct Selection {
    pub selected: usize,
}

/// GET /api/v1/locations
pub async fn list_locations(State(state): State<DashboardState>) -> Response {
    let session = state.session.read().await;
    ApiResponse::ok(LocationList {
        selected: session.app.selected_index(),
        locations: session.app.locations().to_vec(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: String,
}

/// GET /api/v1/search?name= - city suggestions for the add-location box
pub async fn search_places(
    State(state): State<DashboardState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    match provider::search(state.provider.as_ref(), &query.name).await {
        Ok(places) => ApiResponse::ok(places),
        Err(e) => ApiErrorResponse::from_provider(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AddLocationRequest {
    pub name: String,
    /// Replace the current location instead of adding a slide
    #[serde(default)]
    pub current: bool,
}

#[derive(Debug, Serialize)]
pub struct AddedLocation {
    pub index: usize,
    pub location: Location,
}

/// POST /api/v1/locations - geocode a city, fetch its data and add it
pub async fn add_location(
    State(state): State<DashboardState>,
    Json(request): Json<AddLocationRequest>,
) -> Response {
    if request.name.trim().is_empty() {
        return ApiErrorResponse::bad_request("name must not be empty");
    }

    match service::add_city(&state.session, state.provider.as_ref(), &request.name, request.current).await {
        Ok(index) => {
            let session = state.session.read().await;
            match session.app.locations().get(index) {
                Some(location) => ApiResponse::created(AddedLocation {
                    index,
                    location: location.clone(),
                }),
                // Removed by a concurrent request before we could read it back
                None => ApiErrorResponse::not_found(format!("location '{}' not found", request.name)),
            }
        }
        Err(e) => ApiErrorResponse::from_provider(&e),
    }
}

/// DELETE /api/v1/locations/:index
pub async fn remove_location(State(state): State<DashboardState>, Path(index): Path<usize>) -> Response {
    let mut session = state.session.write().await;
    match session.app.remove_location(index) {
        Ok(removed) => ApiResponse::ok(removed),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

/// POST /api/v1/locations/:index/select
pub async fn select_location(State(state): State<DashboardState>, Path(index): Path<usize>) -> Response {
    let mut session = state.session.write().await;
    match session.app.select(index) {
        Ok(()) => ApiResponse::ok(Selection { selected: index }),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub direction: Swipe,
}

/// POST /api/v1/locations/swipe - move the selection one slide
pub async fn swipe_location(
    State(state): State<DashboardState>,
    Json(request): Json<SwipeRequest>,
) -> Response {
    let mut session = state.session.write().await;
    match session.app.swipe(request.direction) {
        Ok(selected) => ApiResponse::ok(Selection { selected }),
        Err(e) => ApiErrorResponse::from_state(&e),
    }
}

/// POST /api/v1/locations/refresh - re-fetch every location now
pub async fn refresh_locations(State(state): State<DashboardState>) -> Response {
    let report = service::refresh_all(&state.session, state.provider.as_ref()).await;
    ApiResponse::ok(report)
}
