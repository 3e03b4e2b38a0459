//! Render-ready dashboard view.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use super::{AppState, TimeFormat};
use crate::alarm::{Alarm, AlarmScheduler};
use crate::aqi::{bar_height_percent, Standard, PRIMARY_POLLUTANT};
use crate::location::Location;

/// Forecast bars carry a time label every this many hours.
const LABEL_EVERY: usize = 4;

const NO_DATA_STATUS: &str = "No data";
const NO_DATA_COLOR: &str = "#9e9e9e";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastBar {
    pub hour: u32,
    pub index: u16,
    pub height_percent: f64,
    pub color: &'static str,
    pub label: Option<String>,
    /// An active alarm is set for this hour
    pub alarm_marker: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub name: String,
    pub country: Option<String>,
    pub is_current: bool,
    pub aqi: Option<u16>,
    pub status: &'static str,
    pub color: &'static str,
    pub primary_pollutant: &'static str,
    pub updated: String,
    pub forecast: Vec<ForecastBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub standard: Standard,
    pub time_format: TimeFormat,
    pub selected: usize,
    /// One entry per slide, true for the selected one
    pub dots: Vec<bool>,
    pub slides: Vec<Slide>,
}

/// Forecast axis label for an hour of the day.
///
/// ```
/// use airwatch::state::{time_label, TimeFormat};
///
/// assert_eq!(time_label(7, TimeFormat::H24), "07:00");
/// assert_eq!(time_label(0, TimeFormat::H12), "12AM");
/// assert_eq!(time_label(15, TimeFormat::H12), "3PM");
/// ```
pub fn time_label(hour: u32, format: TimeFormat) -> String {
    match format {
        TimeFormat::H24 => format!("{hour:02}:00"),
        TimeFormat::H12 => {
            let suffix = if hour >= 12 { "PM" } else { "AM" };
            let h12 = match hour % 12 {
                0 => 12,
                h => h,
            };
            format!("{h12}{suffix}")
        }
    }
}

/// Active alarms placed on the absolute timeline, so each location's
/// forecast bars can be marked in that location's own local hours.
struct AlarmMarkers<'a, Tz: TimeZone> {
    scheduler: AlarmScheduler<Tz>,
    alarms: Vec<&'a Alarm>,
}

impl<Tz: TimeZone> AlarmMarkers<'_, Tz> {
    /// True when an alarm fires within the hour starting at `start`.
    fn covers(&self, start: DateTime<Utc>) -> bool {
        let end = start + Duration::hours(1);
        self.alarms.iter().any(|alarm| {
            self.scheduler
                .next_fire_after(alarm, start - Duration::nanoseconds(1))
                .is_some_and(|fire| fire < end)
        })
    }
}

impl DashboardView {
    pub(super) fn build<Tz: TimeZone>(
        app: &AppState,
        tz: Tz,
        now: DateTime<Utc>,
        forecast_hours: usize,
    ) -> Self {
        let settings = app.settings();
        let markers = AlarmMarkers {
            scheduler: AlarmScheduler::with_timezone(tz, 0),
            alarms: app.alarms().iter().filter(|a| a.active).collect(),
        };

        let slides = app
            .locations()
            .iter()
            .map(|loc| {
                slide(
                    loc,
                    settings.standard,
                    settings.time_format,
                    &markers,
                    now,
                    forecast_hours,
                )
            })
            .collect();

        Self {
            standard: settings.standard,
            time_format: settings.time_format,
            selected: app.selected_index(),
            dots: (0..app.locations().len())
                .map(|i| i == app.selected_index())
                .collect(),
            slides,
        }
    }
}

fn slide<Tz: TimeZone>(
    loc: &Location,
    standard: Standard,
    time_format: TimeFormat,
    markers: &AlarmMarkers<'_, Tz>,
    now: DateTime<Utc>,
    forecast_hours: usize,
) -> Slide {
    let offset = Duration::seconds(i64::from(loc.utc_offset_seconds));
    let forecast = loc
        .forecast(standard, now, forecast_hours)
        .into_iter()
        .enumerate()
        .map(|(i, point)| ForecastBar {
            hour: point.hour,
            index: point.index,
            height_percent: bar_height_percent(point.index, standard),
            color: standard.category(point.index).color(),
            label: (i % LABEL_EVERY == 0).then(|| time_label(point.hour, time_format)),
            alarm_marker: markers.covers((point.time - offset).and_utc()),
        })
        .collect();

    Slide {
        name: loc.name.clone(),
        country: loc.country.clone(),
        is_current: loc.is_current,
        aqi: loc.aqi.as_ref().map(|r| r.index),
        status: loc.aqi.as_ref().map_or(NO_DATA_STATUS, |r| r.status),
        color: loc.aqi.as_ref().map_or(NO_DATA_COLOR, |r| r.color),
        primary_pollutant: PRIMARY_POLLUTANT,
        updated: loc.updated_label(now),
        forecast,
    }
}
