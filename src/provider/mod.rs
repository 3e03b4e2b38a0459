//! External data sources: geocoding, air quality, and weather.
//!
//! [`DataProvider`] is the seam between the service and the network;
//! [`OpenMeteoClient`] is the production implementation and tests swap in
//! a canned provider.

mod open_meteo;

pub use open_meteo::OpenMeteoClient;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::aqi::Standard;
use crate::location::{Coordinates, HourlySeries, Location, MetricSnapshot};

/// Shortest city name the search will look up.
pub const MIN_QUERY_CHARS: usize = 3;

/// Most places returned by a search.
pub const MAX_SEARCH_RESULTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no location found for '{0}'")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("search query must be at least {MIN_QUERY_CHARS} characters")]
    QueryTooShort,
}

/// A geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub name: String,
    pub country: Option<String>,
    /// First-level region (state, province)
    pub admin1: Option<String>,
    pub coordinates: Coordinates,
}

/// Air-quality sample: current concentrations plus an hourly PM2.5 series
/// in the location's local time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirQuality {
    pub utc_offset_seconds: i32,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub hourly_times: Vec<NaiveDateTime>,
    pub hourly_pm2_5: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weather {
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub hourly_times: Vec<NaiveDateTime>,
    pub hourly_temperature: Vec<Option<f64>>,
    pub hourly_relative_humidity: Vec<Option<f64>>,
    pub hourly_wind_speed: Vec<Option<f64>>,
}

#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Places matching `name`, best match first. Empty when nothing matches.
    async fn geocode(&self, name: &str, count: usize) -> Result<Vec<Place>, ProviderError>;

    async fn air_quality(&self, coordinates: Coordinates) -> Result<AirQuality, ProviderError>;

    async fn weather(&self, coordinates: Coordinates) -> Result<Weather, ProviderError>;
}

/// City search for the add-location flow.
pub async fn search(provider: &dyn DataProvider, query: &str) -> Result<Vec<Place>, ProviderError> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(ProviderError::QueryTooShort);
    }
    provider.geocode(query, MAX_SEARCH_RESULTS).await
}

/// Geocode a city and fetch everything the dashboard shows for it.
///
/// Air quality is required; weather is best-effort and leaves its fields
/// empty on failure.
pub async fn fetch_location(
    provider: &dyn DataProvider,
    name: &str,
    is_current: bool,
    standard: Standard,
    now: DateTime<Utc>,
) -> Result<Location, ProviderError> {
    let place = provider
        .geocode(name.trim(), 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NotFound(name.trim().to_string()))?;

    let air = provider.air_quality(place.coordinates).await?;

    let weather = match provider.weather(place.coordinates).await {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(location = %place.name, error = %e, "Weather fetch failed, continuing without it");
            None
        }
    };

    let mut location = assemble(place, air, weather, is_current, now);
    location.recompute(standard);
    debug!(
        location = %location.name,
        pm2_5 = ?location.current.pm2_5,
        hourly = location.hourly.len(),
        "Location fetched"
    );
    Ok(location)
}

fn assemble(
    place: Place,
    air: AirQuality,
    weather: Option<Weather>,
    is_current: bool,
    now: DateTime<Utc>,
) -> Location {
    let mut current = MetricSnapshot {
        pm2_5: air.pm2_5,
        pm10: air.pm10,
        nitrogen_dioxide: air.nitrogen_dioxide,
        ozone: air.ozone,
        ..MetricSnapshot::default()
    };

    let slots = air.hourly_times.len();
    let mut hourly = HourlySeries {
        pm2_5: air.hourly_pm2_5,
        temperature: vec![None; slots],
        relative_humidity: vec![None; slots],
        wind_speed: vec![None; slots],
        times: air.hourly_times,
    };
    hourly.pm2_5.resize(slots, None);

    if let Some(w) = weather {
        current.temperature = w.temperature;
        current.relative_humidity = w.relative_humidity;
        current.wind_speed = w.wind_speed;

        // The two providers may cover different ranges; align on timestamps
        let slot_of: HashMap<NaiveDateTime, usize> = hourly
            .times
            .iter()
            .enumerate()
            .map(|(i, t)| (*t, i))
            .collect();
        for (i, time) in w.hourly_times.iter().enumerate() {
            if let Some(&slot) = slot_of.get(time) {
                hourly.temperature[slot] = w.hourly_temperature.get(i).copied().flatten();
                hourly.relative_humidity[slot] =
                    w.hourly_relative_humidity.get(i).copied().flatten();
                hourly.wind_speed[slot] = w.hourly_wind_speed.get(i).copied().flatten();
            }
        }
    }

    Location {
        name: place.name,
        country: place.country,
        coordinates: place.coordinates,
        utc_offset_seconds: air.utc_offset_seconds,
        current,
        hourly,
        aqi: None,
        updated_at: now,
        is_current,
    }
}
