//! Open-Meteo client (geocoding, air-quality, and forecast APIs).

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{AirQuality, DataProvider, Place, ProviderError, Weather};
use crate::config::ProvidersConfig;
use crate::location::Coordinates;

/// Open-Meteo hourly timestamps carry no seconds.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    current: AirQualityCurrent,
    hourly: AirQualityHourly,
}

#[derive(Debug, Deserialize)]
struct AirQualityCurrent {
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    nitrogen_dioxide: Option<f64>,
    ozone: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AirQualityHourly {
    time: Vec<String>,
    pm2_5: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: ForecastCurrent,
    hourly: ForecastHourly,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastHourly {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
}

fn parse_times(raw: &[String]) -> Result<Vec<NaiveDateTime>, ProviderError> {
    raw.iter()
        .map(|t| {
            NaiveDateTime::parse_from_str(t, TIME_FORMAT)
                .map_err(|e| ProviderError::Malformed(format!("bad hourly time '{t}': {e}")))
        })
        .collect()
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the Open-Meteo APIs.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    geocoding_url: String,
    air_quality_url: String,
    weather_url: String,
}

impl OpenMeteoClient {
    pub fn new(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("airwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            geocoding_url: config.geocoding_url.trim_end_matches('/').to_string(),
            air_quality_url: config.air_quality_url.trim_end_matches('/').to_string(),
            weather_url: config.weather_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let resp = self.http.get(url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn coordinate_query(coordinates: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", coordinates.latitude.to_string()),
            ("longitude", coordinates.longitude.to_string()),
            ("timezone", "auto".to_string()),
        ]
    }
}

#[async_trait]
impl DataProvider for OpenMeteoClient {
    async fn geocode(&self, name: &str, count: usize) -> Result<Vec<Place>, ProviderError> {
        let query = [
            ("name", name.to_string()),
            ("count", count.to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];
        let resp: GeocodingResponse = self.get_json(&self.geocoding_url, &query).await?;

        Ok(resp
            .results
            .into_iter()
            .map(|r| Place {
                name: r.name,
                country: r.country,
                admin1: r.admin1,
                coordinates: Coordinates {
                    latitude: r.latitude,
                    longitude: r.longitude,
                },
            })
            .collect())
    }

    async fn air_quality(&self, coordinates: Coordinates) -> Result<AirQuality, ProviderError> {
        let mut query = Self::coordinate_query(coordinates);
        query.push(("current", "pm2_5,pm10,nitrogen_dioxide,ozone".to_string()));
        query.push(("hourly", "pm2_5".to_string()));
        let resp: AirQualityResponse = self.get_json(&self.air_quality_url, &query).await?;

        if resp.hourly.time.len() != resp.hourly.pm2_5.len() {
            return Err(ProviderError::Malformed(format!(
                "hourly series length mismatch: {} times, {} values",
                resp.hourly.time.len(),
                resp.hourly.pm2_5.len()
            )));
        }

        Ok(AirQuality {
            utc_offset_seconds: resp.utc_offset_seconds,
            pm2_5: resp.current.pm2_5,
            pm10: resp.current.pm10,
            nitrogen_dioxide: resp.current.nitrogen_dioxide,
            ozone: resp.current.ozone,
            hourly_times: parse_times(&resp.hourly.time)?,
            hourly_pm2_5: resp.hourly.pm2_5,
        })
    }

    async fn weather(&self, coordinates: Coordinates) -> Result<Weather, ProviderError> {
        let fields = "temperature_2m,relative_humidity_2m,wind_speed_10m";
        let mut query = Self::coordinate_query(coordinates);
        query.push(("current", fields.to_string()));
        query.push(("hourly", fields.to_string()));
        let resp: ForecastResponse = self.get_json(&self.weather_url, &query).await?;

        Ok(Weather {
            temperature: resp.current.temperature_2m,
            relative_humidity: resp.current.relative_humidity_2m,
            wind_speed: resp.current.wind_speed_10m,
            hourly_times: parse_times(&resp.hourly.time)?,
            hourly_temperature: resp.hourly.temperature_2m,
            hourly_relative_humidity: resp.hourly.relative_humidity_2m,
            hourly_wind_speed: resp.hourly.wind_speed_10m,
        })
    }
}
