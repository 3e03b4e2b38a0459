//! Consistent response envelope for all `/api/v1` endpoints.
//!
//! Every response is wrapped in either [`ApiResponse`] (success) or
//! [`ApiErrorResponse`] (error), so clients see one JSON shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::alarm::SnoozeError;
use crate::provider::ProviderError;
use crate::state::StateError;

/// Metadata included in every response.
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: "1",
        }
    }
}

/// Successful response: `{ "data": T, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Response {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error response: `{ "error": { "code": "...", "message": "..." }, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn build(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
        let body = Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: msg.into(),
            },
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::CONFLICT, "CONFLICT", msg)
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
    }
}

// ============================================================================
// Domain error mapping
// ============================================================================

impl ApiErrorResponse {
    pub fn from_state(err: &StateError) -> Response {
        match err {
            StateError::UnknownAlarm(_)
            | StateError::InvalidIndex { .. }
            | StateError::UnknownLocation(_) => Self::not_found(err.to_string()),
            StateError::CannotRemoveCurrent | StateError::NoLocationSelected => {
                Self::conflict(err.to_string())
            }
            StateError::InvalidAlarm(_) => Self::bad_request(err.to_string()),
        }
    }

    pub fn from_provider(err: &ProviderError) -> Response {
        match err {
            ProviderError::NotFound(_) => Self::not_found(err.to_string()),
            ProviderError::QueryTooShort => Self::bad_request(err.to_string()),
            ProviderError::Network(_) | ProviderError::Status(_) | ProviderError::Malformed(_) => {
                Self::bad_gateway(err.to_string())
            }
        }
    }

    pub fn from_snooze(err: &SnoozeError) -> Response {
        Self::conflict(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"hello": "world"}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        assert_eq!(v["data"]["hello"], "world");
        assert_eq!(v["meta"]["version"], "1");
        assert!(v["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = ApiErrorResponse::not_found("gone");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let v = body_json(resp).await;
        assert_eq!(v["error"]["code"], "NOT_FOUND");
        assert_eq!(v["error"]["message"], "gone");
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            ApiErrorResponse::from_state(&StateError::UnknownAlarm(3)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiErrorResponse::from_state(&StateError::CannotRemoveCurrent).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiErrorResponse::from_provider(&ProviderError::QueryTooShort).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiErrorResponse::from_provider(&ProviderError::Malformed("x".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiErrorResponse::from_snooze(&SnoozeError::NotRinging).status(),
            StatusCode::CONFLICT
        );
    }
}
