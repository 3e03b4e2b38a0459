//! Location snapshots: live metrics, raw hourly series, and forecasts.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

use crate::alarm::Metric;
use crate::aqi::{calculate_index, Reading, Standard};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Live values for a location. Any field may be missing when a provider
/// omits it or the weather fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nitrogen_dioxide: Option<f64>,
    pub ozone: Option<f64>,
    pub temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl MetricSnapshot {
    /// Current value of a metric. `Aqi` is derived from PM2.5 under the
    /// given standard.
    pub fn value(&self, metric: Metric, standard: Standard) -> Option<f64> {
        match metric {
            Metric::Aqi => self
                .pm2_5
                .map(|c| f64::from(calculate_index(c, standard))),
            Metric::Pm25 => self.pm2_5,
            Metric::Pm10 => self.pm10,
            Metric::NitrogenDioxide => self.nitrogen_dioxide,
            Metric::Ozone => self.ozone,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.relative_humidity,
            Metric::WindSpeed => self.wind_speed,
        }
    }
}

/// Raw hourly samples in the location's local time.
///
/// Kept so indexes can be recomputed when the standard changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlySeries {
    pub times: Vec<NaiveDateTime>,
    pub pm2_5: Vec<Option<f64>>,
    pub temperature: Vec<Option<f64>>,
    pub relative_humidity: Vec<Option<f64>>,
    pub wind_speed: Vec<Option<f64>>,
}

impl HourlySeries {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Position of the first sample at or after `time`.
    pub fn position_from(&self, time: NaiveDateTime) -> Option<usize> {
        self.times.iter().position(|t| *t >= time)
    }
}

/// One forecast bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastPoint {
    pub time: NaiveDateTime,
    /// Hour of day, 0-23
    pub hour: u32,
    pub index: u16,
}

/// A tracked location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Coordinates,
    /// Offset of the location's local time from UTC
    pub utc_offset_seconds: i32,
    pub current: MetricSnapshot,
    #[serde(skip)]
    pub hourly: HourlySeries,
    /// Cached conversion of `current.pm2_5`
    pub aqi: Option<Reading>,
    pub updated_at: DateTime<Utc>,
    pub is_current: bool,
}

impl Location {
    /// Refresh the cached AQI from raw PM2.5.
    pub fn recompute(&mut self, standard: Standard) {
        self.aqi = self
            .current
            .pm2_5
            .map(|c| Reading::from_concentration(c, standard));
    }

    /// Wall-clock time at the location.
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + Duration::seconds(i64::from(self.utc_offset_seconds))
    }

    /// Hourly index forecast starting at the current local hour.
    ///
    /// Covers at most `hours` hourly slots; slots without a PM2.5 sample
    /// are left out.
    pub fn forecast(&self, standard: Standard, now: DateTime<Utc>, hours: usize) -> Vec<ForecastPoint> {
        let local = self.local_time(now);
        let hour_start = local
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(local);

        let Some(start) = self.hourly.position_from(hour_start) else {
            return Vec::new();
        };

        self.hourly.times[start..]
            .iter()
            .zip(&self.hourly.pm2_5[start.min(self.hourly.pm2_5.len())..])
            .take(hours)
            .filter_map(|(time, pm)| {
                pm.map(|c| ForecastPoint {
                    time: *time,
                    hour: time.hour(),
                    index: calculate_index(c, standard),
                })
            })
            .collect()
    }

    /// Short "last updated" text.
    pub fn updated_label(&self, now: DateTime<Utc>) -> String {
        let age = now - self.updated_at;
        if age < Duration::minutes(1) {
            "Now".to_string()
        } else if age < Duration::hours(1) {
            format!("{} min ago", age.num_minutes())
        } else {
            self.local_time(self.updated_at).format("%H:%M").to_string()
        }
    }
}
