//! Alarm conditions: a metric compared against a threshold.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aqi::Standard;
use crate::location::Location;

/// Threshold used by `Condition::always()`. Every metric the providers
/// report is greater than this.
pub const ALWAYS_TRUE_THRESHOLD: f64 = -9999.0;

/// A live value an alarm can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// PM2.5 converted to an index under the active standard
    #[default]
    Aqi,
    #[serde(rename = "pm2_5")]
    Pm25,
    Pm10,
    NitrogenDioxide,
    Ozone,
    /// Degrees Celsius
    Temperature,
    /// Relative humidity, percent
    Humidity,
    /// km/h
    WindSpeed,
}

impl Metric {
    /// Short display name.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Aqi => "AQI",
            Metric::Pm25 => "PM2.5",
            Metric::Pm10 => "PM10",
            Metric::NitrogenDioxide => "NO2",
            Metric::Ozone => "O3",
            Metric::Temperature => "Temp",
            Metric::Humidity => "Humidity",
            Metric::WindSpeed => "Wind",
        }
    }
}

/// Comparison operator. Equality satisfies neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Lt,
    Gt,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Gt => ">",
        }
    }
}

/// Compare a live value against a threshold.
///
/// ```
/// use airwatch::alarm::{evaluate, Operator};
///
/// assert!(!evaluate(50.0, Operator::Lt, 50.0));
/// assert!(evaluate(49.0, Operator::Lt, 50.0));
/// assert!(!evaluate(50.0, Operator::Gt, 50.0));
/// assert!(evaluate(51.0, Operator::Gt, 50.0));
/// ```
pub fn evaluate(value: f64, operator: Operator, threshold: f64) -> bool {
    match operator {
        Operator::Lt => value < threshold,
        Operator::Gt => value > threshold,
    }
}

/// The single condition attached to an alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub metric: Metric,
    pub operator: Operator,
    pub threshold: f64,
}

impl Condition {
    pub fn new(metric: Metric, operator: Operator, threshold: f64) -> Self {
        Self {
            metric,
            operator,
            threshold,
        }
    }

    /// A condition that holds for any reported value. Used by snoozed
    /// alarms that do not keep the original condition.
    pub fn always() -> Self {
        Self::new(Metric::Aqi, Operator::Gt, ALWAYS_TRUE_THRESHOLD)
    }

    /// Check the condition against a raw value.
    pub fn holds(&self, value: f64) -> bool {
        evaluate(value, self.operator, self.threshold)
    }

    /// Check the condition against a location's live snapshot.
    ///
    /// Returns `None` when the location has no value for the metric.
    pub fn is_met(&self, location: &Location, standard: Standard) -> Option<bool> {
        location
            .current
            .value(self.metric, standard)
            .map(|v| self.holds(v))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.metric.label(),
            self.operator.symbol(),
            self.threshold
        )
    }
}
