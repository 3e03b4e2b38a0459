//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* endpoints using `tower::ServiceExt::oneshot()`, backed by a
//! fake data provider. No binary spawn, no network.

use airwatch::api::{create_app, DashboardState};
use airwatch::config::{self, AppConfig};
use airwatch::provider::{AirQuality, DataProvider, Place, ProviderError, Weather};
use airwatch::location::Coordinates;
use airwatch::service::{self, SharedSession};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Local, Timelike, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// ============================================================================
// Fixtures
// ============================================================================

/// Serves every city at the same PM2.5 level, in UTC.
struct FakeProvider {
    pm2_5: Mutex<f64>,
}

impl FakeProvider {
    fn new(pm2_5: f64) -> Arc<Self> {
        Arc::new(Self {
            pm2_5: Mutex::new(pm2_5),
        })
    }

    fn set_pm2_5(&self, value: f64) {
        *self.pm2_5.lock().unwrap() = value;
    }
}

#[async_trait]
impl DataProvider for FakeProvider {
    async fn geocode(&self, name: &str, count: usize) -> Result<Vec<Place>, ProviderError> {
        match name.to_ascii_lowercase().as_str() {
            "atlantis" => Ok(Vec::new()),
            "offline" => Err(ProviderError::Malformed("connection reset".to_string())),
            _ => Ok((0..count.min(3))
                .map(|i| Place {
                    name: if i == 0 { name.to_string() } else { format!("{name} {i}") },
                    country: Some("Testland".to_string()),
                    admin1: None,
                    coordinates: Coordinates {
                        latitude: 10.0,
                        longitude: 20.0,
                    },
                })
                .collect()),
        }
    }

    async fn air_quality(&self, _: Coordinates) -> Result<AirQuality, ProviderError> {
        let pm = *self.pm2_5.lock().unwrap();
        let start = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Ok(AirQuality {
            utc_offset_seconds: 0,
            pm2_5: Some(pm),
            pm10: Some(pm * 1.5),
            hourly_times: (0..72).map(|h| start + Duration::hours(h)).collect(),
            hourly_pm2_5: vec![Some(pm); 72],
            ..AirQuality::default()
        })
    }

    async fn weather(&self, _: Coordinates) -> Result<Weather, ProviderError> {
        Err(ProviderError::Malformed("weather disabled in tests".to_string()))
    }
}

fn ensure_config() {
    if !config::is_initialized() {
        config::init(AppConfig::default());
    }
}

struct Harness {
    session: SharedSession,
    provider: Arc<FakeProvider>,
}

impl Harness {
    fn new(pm2_5: f64) -> Self {
        ensure_config();
        Self {
            session: service::new_session(&AppConfig::default()),
            provider: FakeProvider::new(pm2_5),
        }
    }

    async fn with_current(pm2_5: f64) -> Self {
        let harness = Self::new(pm2_5);
        service::bootstrap(&harness.session, harness.provider.as_ref(), "Shanghai").await;
        harness
    }

    fn state(&self) -> DashboardState {
        let provider: Arc<dyn DataProvider> = self.provider.clone();
        DashboardState::new(self.session.clone(), provider, 24)
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let app = create_app(self.state());
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => request
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }
}

fn alarm_body(time: &str) -> Value {
    json!({
        "time": time,
        "label": "Run",
        "location": "Current Location",
        "metric": "aqi",
        "operator": "lt",
        "threshold": 50,
        "repeat": ["Mon", "Wed"],
        "snooze": { "enabled": true, "duration_minutes": 5, "retain_settings": false }
    })
}

// ============================================================================
// Read-only endpoints
// ============================================================================

/// All GET endpoints should return 200 on a fresh session.
#[tokio::test]
async fn test_get_endpoints_return_200() {
    let harness = Harness::new(20.0);

    let endpoints = [
        "/health",
        "/api/v1/health",
        "/api/v1/dashboard",
        "/api/v1/aqi?concentration=35",
        "/api/v1/locations",
        "/api/v1/alarms",
        "/api/v1/alarms/ringing",
        "/api/v1/settings",
        "/api/v1/config",
    ];

    for endpoint in &endpoints {
        let (status, _) = harness.get(endpoint).await;
        assert!(status.is_success(), "GET {endpoint} returned status {status}");
    }
}

#[tokio::test]
async fn test_envelope_and_root_health() {
    let harness = Harness::new(20.0);

    let (_, body) = harness.get("/api/v1/health").await;
    assert_eq!(body["meta"]["version"], "1");
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["locations"], 0);

    // The root probe is not enveloped
    let (_, body) = harness.get("/health").await;
    assert_eq!(body["status"], "healthy");
    assert!(body.get("meta").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let harness = Harness::new(20.0);
    let (status, _) = harness.get("/api/v1/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_aqi_conversion() {
    let harness = Harness::new(20.0);

    let (status, body) = harness.get("/api/v1/aqi?concentration=40&standard=CN").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["standard"], "CN");
    assert_eq!(body["data"]["index"], 57);
    assert_eq!(body["data"]["status"], "Moderate");

    // Session standard (US) when none is given
    let (_, body) = harness.get("/api/v1/aqi?concentration=12").await;
    assert_eq!(body["data"]["standard"], "US");
    assert_eq!(body["data"]["index"], 50);
    assert_eq!(body["data"]["bar_height_percent"], 10.0);

    // Unknown codes fall back to US
    let (_, body) = harness.get("/api/v1/aqi?concentration=12&standard=XX").await;
    assert_eq!(body["data"]["standard"], "US");

    let (status, _) = harness.get("/api/v1/aqi?concentration=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_endpoint_exposes_sections() {
    let harness = Harness::new(20.0);
    let (_, body) = harness.get("/api/v1/config").await;
    for section in ["server", "providers", "dashboard", "alarms"] {
        assert!(body["data"].get(section).is_some(), "missing [{section}]");
    }
}

// ============================================================================
// Locations
// ============================================================================

#[tokio::test]
async fn test_search_requires_three_characters() {
    let harness = Harness::new(20.0);

    let (status, body) = harness.get("/api/v1/search?name=Pa").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = harness.get("/api/v1/search?name=Paris").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["name"], "Paris");

    let (_, body) = harness.get("/api/v1/search?name=Atlantis").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_add_select_and_remove_locations() {
    let harness = Harness::with_current(40.0).await;

    let (status, body) = harness.post("/api/v1/locations", json!({"name": "Paris"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["index"], 1);
    assert_eq!(body["data"]["location"]["aqi"]["index"], 112);

    let (_, body) = harness.get("/api/v1/dashboard").await;
    let slides = body["data"]["slides"].as_array().unwrap();
    assert_eq!(slides.len(), 2);
    assert_eq!(slides[0]["is_current"], true);
    assert_eq!(body["data"]["selected"], 1);
    assert_eq!(slides[1]["forecast"].as_array().unwrap().len(), 24);

    let (status, body) = harness.post("/api/v1/locations/0/select", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["selected"], 0);

    let (_, body) = harness
        .post("/api/v1/locations/swipe", json!({"direction": "left"}))
        .await;
    assert_eq!(body["data"]["selected"], 1);

    let (status, _) = harness.post("/api/v1/locations/7/select", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = harness.call(Method::DELETE, "/api/v1/locations/0", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = harness.call(Method::DELETE, "/api/v1/locations/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Paris");
}

#[tokio::test]
async fn test_add_location_errors() {
    let harness = Harness::new(20.0);

    let (status, _) = harness.post("/api/v1/locations", json!({"name": "Atlantis"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = harness.post("/api/v1/locations", json!({"name": "offline"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");

    let (status, _) = harness.post("/api/v1/locations", json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_updates_readings() {
    let harness = Harness::with_current(10.0).await;
    let (_, body) = harness.get("/api/v1/locations").await;
    assert_eq!(body["data"]["locations"][0]["aqi"]["status"], "Good");

    harness.provider.set_pm2_5(200.0);
    let (status, body) = harness.post("/api/v1/locations/refresh", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["refreshed"], 1);
    assert_eq!(body["data"]["failed"], 0);

    let (_, body) = harness.get("/api/v1/locations").await;
    assert_eq!(body["data"]["locations"][0]["aqi"]["status"], "Very Unhealthy");
    assert_eq!(body["data"]["locations"][0]["is_current"], true);
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn test_settings_switch_standard() {
    let harness = Harness::with_current(40.0).await;

    let (status, body) = harness
        .post("/api/v1/settings", json!({"standard": "UK", "time_format": "12h"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["standard"], "UK");
    assert_eq!(body["data"]["time_format"], "12h");

    let (_, body) = harness.get("/api/v1/locations").await;
    assert_eq!(body["data"]["locations"][0]["aqi"]["standard"], "UK");

    // Partial update keeps the other field
    let (_, body) = harness.post("/api/v1/settings", json!({"standard": "IN"})).await;
    assert_eq!(body["data"]["standard"], "IN");
    assert_eq!(body["data"]["time_format"], "12h");
}

// ============================================================================
// Alarms
// ============================================================================

#[tokio::test]
async fn test_alarm_crud() {
    let harness = Harness::new(20.0);

    let (status, body) = harness.post("/api/v1/alarms", alarm_body("07:30")).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_u64().unwrap();
    assert_eq!(body["data"]["active"], true);
    assert_eq!(body["data"]["sound"], "radar");
    assert_eq!(body["data"]["repeat"], json!(["Mon", "Wed"]));

    let (status, body) = harness
        .call(Method::PUT, &format!("/api/v1/alarms/{id}"), Some(alarm_body("08:45")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["time"], "08:45");

    let (_, body) = harness.post(&format!("/api/v1/alarms/{id}/toggle"), json!({})).await;
    assert_eq!(body["data"]["active"], false);

    let (_, body) = harness.get("/api/v1/alarms").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = harness.call(Method::DELETE, &format!("/api/v1/alarms/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = harness.call(Method::DELETE, &format!("/api/v1/alarms/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_alarm_validation() {
    let harness = Harness::new(20.0);

    let (status, body) = harness.post("/api/v1/alarms", alarm_body("25:99")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let mut bad_snooze = alarm_body("07:00");
    bad_snooze["snooze"]["duration_minutes"] = json!(90);
    let (status, _) = harness.post("/api/v1/alarms", bad_snooze).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = harness.get("/api/v1/alarms").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_and_snooze_when_idle() {
    let harness = Harness::new(20.0);

    let (status, body) = harness.post("/api/v1/alarms/stop", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["stopped"].is_null());
    assert_eq!(body["data"]["clock"]["state"], "idle");

    let (status, _) = harness.post("/api/v1/alarms/snooze", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

/// Drive the clock past an alarm and walk the ring / snooze flow over HTTP.
#[tokio::test]
async fn test_ring_then_snooze() {
    let harness = Harness::with_current(20.0).await;

    let t0 = Utc::now();
    let fire_local = (t0 + Duration::minutes(2))
        .with_timezone(&Local)
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap();
    let mut body = alarm_body(&fire_local.format("%H:%M").to_string());
    body["operator"] = json!("gt");
    body["threshold"] = json!(0);
    body["repeat"] = json!(["Never"]);
    let (status, created) = harness.post("/api/v1/alarms", body).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_u64().unwrap();

    {
        let mut session = harness.session.write().await;
        assert!(session.tick(t0).is_empty());
        let rung = session.tick(fire_local.with_timezone(&Utc) + Duration::seconds(1));
        assert_eq!(rung.len(), 1);
    }

    let (_, body) = harness.get("/api/v1/alarms/ringing").await;
    assert_eq!(body["data"]["clock"]["state"], "ringing");
    assert_eq!(body["data"]["clock"]["alarm"]["id"], id);

    // One-shot alarms switch off once they ring
    let (_, body) = harness.get("/api/v1/alarms").await;
    assert_eq!(body["data"][0]["active"], false);

    let (status, body) = harness.post("/api/v1/alarms/snooze", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["repeat"], json!(["Never"]));
    assert_eq!(body["data"]["condition"]["threshold"], -9999.0);

    let (_, body) = harness.get("/api/v1/alarms/ringing").await;
    assert_eq!(body["data"]["clock"]["state"], "idle");

    let (_, body) = harness.get("/api/v1/alarms").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}
