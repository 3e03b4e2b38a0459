//! Alarm definitions and the submission form they are built from.

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::condition::{Condition, Metric, Operator};

/// Name the dashboard uses for the device's own location.
pub const CURRENT_LOCATION: &str = "Current Location";

/// Longest snooze a user can configure (minutes).
pub const MAX_SNOOZE_MINUTES: u32 = 60;

// ============================================================================
// Errors
// ============================================================================

/// Rejected alarm submission.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AlarmError {
    #[error("invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("invalid repeat day '{0}'")]
    InvalidDay(String),
    #[error("threshold must be a finite number")]
    InvalidThreshold,
    #[error("snooze duration must be between 1 and {MAX_SNOOZE_MINUTES} minutes, got {0}")]
    InvalidSnooze(u32),
}

// ============================================================================
// Time of Day
// ============================================================================

/// Minute-resolution time of day, serialized as "HH:MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    pub fn minute(self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(self) -> NaiveTime {
        self.0
    }

    /// Truncate a time to the minute.
    pub fn from_naive(time: NaiveTime) -> Self {
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(NaiveTime::MIN))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| AlarmError::InvalidTime(s.to_string()))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Repeat
// ============================================================================

/// Days an alarm repeats on. `Never` fires once on whichever day the time
/// comes around first.
///
/// Serialized as a list: `["Never"]` or `["Mon", "Wed"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum Repeat {
    #[default]
    Never,
    /// Sorted Monday-first, no duplicates, never empty
    Days(Vec<Weekday>),
}

impl Repeat {
    /// Build from any set of days. An empty set means `Never`.
    pub fn days(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut days: Vec<Weekday> = days.into_iter().collect();
        days.sort_by_key(Weekday::num_days_from_monday);
        days.dedup();
        if days.is_empty() {
            Repeat::Never
        } else {
            Repeat::Days(days)
        }
    }

    /// Every day of the week.
    pub fn daily() -> Self {
        Self::days([
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ])
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Repeat::Never)
    }

    /// Whether an alarm with this repeat may fire on `day`.
    pub fn includes(&self, day: Weekday) -> bool {
        match self {
            Repeat::Never => true,
            Repeat::Days(days) => days.contains(&day),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repeat::Never => f.write_str("Once"),
            Repeat::Days(days) if days.len() == 7 => f.write_str("Daily"),
            Repeat::Days(days) => {
                let names: Vec<String> = days.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

fn parse_weekday(raw: &str) -> Result<Weekday, AlarmError> {
    let trimmed = raw.trim();
    if let Ok(day) = trimmed.parse::<Weekday>() {
        return Ok(day);
    }
    // Plural forms ("Mondays") as used by the repeat picker
    trimmed
        .strip_suffix('s')
        .and_then(|singular| singular.parse::<Weekday>().ok())
        .ok_or_else(|| AlarmError::InvalidDay(raw.to_string()))
}

impl TryFrom<Vec<String>> for Repeat {
    type Error = AlarmError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        if values.iter().any(|v| v.trim().eq_ignore_ascii_case("never")) {
            return Ok(Repeat::Never);
        }
        if values.iter().any(|v| v.trim().eq_ignore_ascii_case("daily")) {
            return Ok(Repeat::daily());
        }
        let days = values
            .iter()
            .map(|v| parse_weekday(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Repeat::days(days))
    }
}

impl From<Repeat> for Vec<String> {
    fn from(repeat: Repeat) -> Self {
        match repeat {
            Repeat::Never => vec!["Never".to_string()],
            Repeat::Days(days) => days.iter().map(ToString::to_string).collect(),
        }
    }
}

// ============================================================================
// Location Reference
// ============================================================================

/// Which location an alarm watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocationRef {
    /// The location flagged as the device's current position
    #[default]
    Current,
    /// An added location, by name
    Named(String),
}

impl From<String> for LocationRef {
    fn from(name: String) -> Self {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(CURRENT_LOCATION) {
            LocationRef::Current
        } else {
            LocationRef::Named(trimmed.to_string())
        }
    }
}

impl From<LocationRef> for String {
    fn from(location: LocationRef) -> Self {
        location.to_string()
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationRef::Current => f.write_str(CURRENT_LOCATION),
            LocationRef::Named(name) => f.write_str(name),
        }
    }
}

// ============================================================================
// Alarm
// ============================================================================

/// Snooze behaviour for an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeConfig {
    pub enabled: bool,
    /// Zero in a submission picks the configured default
    #[serde(default)]
    pub duration_minutes: u32,
    /// Keep the original condition on the snoozed alarm. When false the
    /// snoozed alarm rings unconditionally.
    pub retain_settings: bool,
}

/// A threshold alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: u64,
    pub time: TimeOfDay,
    pub label: String,
    pub location: LocationRef,
    pub condition: Condition,
    pub repeat: Repeat,
    pub sound: String,
    pub active: bool,
    pub snooze: Option<SnoozeConfig>,
}

impl Alarm {
    /// Whether the alarm is deactivated after it rings once.
    pub fn is_one_shot(&self) -> bool {
        self.repeat.is_never()
    }

    /// Snooze settings, if snoozing is enabled.
    pub fn snooze_enabled(&self) -> Option<SnoozeConfig> {
        self.snooze.filter(|s| s.enabled)
    }
}

// ============================================================================
// Draft (submission form)
// ============================================================================

/// Values filled in when a submission leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDefaults {
    pub sound: String,
    pub snooze_minutes: u32,
}

impl AlarmDefaults {
    pub fn new(sound: &str, snooze_minutes: u32) -> Self {
        Self {
            sound: sound.to_string(),
            snooze_minutes,
        }
    }
}

fn default_operator() -> Operator {
    Operator::Lt
}

fn default_repeat() -> Vec<String> {
    vec!["Never".to_string()]
}

/// Alarm as submitted by a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmDraft {
    /// "HH:MM"
    pub time: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub location: LocationRef,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default = "default_operator")]
    pub operator: Operator,
    pub threshold: f64,
    #[serde(default = "default_repeat")]
    pub repeat: Vec<String>,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub snooze: Option<SnoozeConfig>,
}

impl AlarmDraft {
    /// Validate the draft and build an active alarm.
    pub fn into_alarm(self, id: u64, defaults: &AlarmDefaults) -> Result<Alarm, AlarmError> {
        let time: TimeOfDay = self.time.parse()?;
        if !self.threshold.is_finite() {
            return Err(AlarmError::InvalidThreshold);
        }

        let snooze = self.snooze.map(|mut s| {
            if s.duration_minutes == 0 {
                s.duration_minutes = defaults.snooze_minutes;
            }
            s
        });
        if let Some(s) = snooze.filter(|s| s.enabled) {
            if s.duration_minutes == 0 || s.duration_minutes > MAX_SNOOZE_MINUTES {
                return Err(AlarmError::InvalidSnooze(s.duration_minutes));
            }
        }

        let repeat = Repeat::try_from(self.repeat)?;
        let sound = self
            .sound
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| defaults.sound.clone());

        Ok(Alarm {
            id,
            time,
            label: self.label.trim().to_string(),
            location: self.location,
            condition: Condition::new(self.metric, self.operator, self.threshold),
            repeat,
            sound,
            active: true,
            snooze,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> AlarmDefaults {
        AlarmDefaults::new("chime", 5)
    }

    fn draft(time: &str) -> AlarmDraft {
        AlarmDraft {
            time: time.to_string(),
            label: " Morning run ".to_string(),
            location: LocationRef::Current,
            metric: Metric::Aqi,
            operator: Operator::Lt,
            threshold: 50.0,
            repeat: vec!["Never".to_string()],
            sound: None,
            snooze: None,
        }
    }

    #[test]
    fn test_time_of_day_parse_and_display() {
        let t: TimeOfDay = "07:05".parse().unwrap();
        assert_eq!(t.hour(), 7);
        assert_eq!(t.minute(), 5);
        assert_eq!(t.to_string(), "07:05");
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("7am".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_repeat_parsing() {
        let r = Repeat::try_from(vec!["Wednesdays".to_string(), "Mon".to_string()]).unwrap();
        assert_eq!(r, Repeat::Days(vec![Weekday::Mon, Weekday::Wed]));
        assert_eq!(r.to_string(), "Mon, Wed");

        let never = Repeat::try_from(vec!["Mon".to_string(), "Never".to_string()]).unwrap();
        assert_eq!(never, Repeat::Never);
        assert_eq!(never.to_string(), "Once");

        assert_eq!(Repeat::try_from(Vec::new()).unwrap(), Repeat::Never);
        assert!(Repeat::try_from(vec!["Someday".to_string()]).is_err());
    }

    #[test]
    fn test_repeat_daily_display() {
        assert_eq!(Repeat::daily().to_string(), "Daily");
        assert_eq!(Repeat::try_from(vec!["daily".to_string()]).unwrap(), Repeat::daily());
        assert!(Repeat::daily().includes(Weekday::Sun));
        assert!(Repeat::Never.includes(Weekday::Sun));
        assert!(!Repeat::days([Weekday::Mon]).includes(Weekday::Tue));
    }

    #[test]
    fn test_location_ref_from_string() {
        assert_eq!(
            LocationRef::from("Current Location".to_string()),
            LocationRef::Current
        );
        assert_eq!(
            LocationRef::from("Paris".to_string()),
            LocationRef::Named("Paris".to_string())
        );
    }

    #[test]
    fn test_draft_into_alarm() {
        let alarm = draft("06:30").into_alarm(7, &defaults()).unwrap();
        assert_eq!(alarm.id, 7);
        assert_eq!(alarm.label, "Morning run");
        assert_eq!(alarm.sound, "chime");
        assert!(alarm.active);
        assert!(alarm.is_one_shot());
    }

    #[test]
    fn test_draft_rejects_bad_input() {
        assert!(matches!(
            draft("6h30").into_alarm(1, &defaults()),
            Err(AlarmError::InvalidTime(_))
        ));

        let mut d = draft("06:30");
        d.threshold = f64::NAN;
        assert_eq!(d.into_alarm(1, &defaults()), Err(AlarmError::InvalidThreshold));

        let mut d = draft("06:30");
        d.snooze = Some(SnoozeConfig {
            enabled: true,
            duration_minutes: 61,
            retain_settings: false,
        });
        assert_eq!(d.into_alarm(1, &defaults()), Err(AlarmError::InvalidSnooze(61)));
    }

    #[test]
    fn test_snooze_duration_defaults() {
        let mut d = draft("06:30");
        d.snooze = Some(SnoozeConfig {
            enabled: true,
            duration_minutes: 0,
            retain_settings: true,
        });
        let alarm = d.into_alarm(1, &defaults()).unwrap();
        assert_eq!(alarm.snooze_enabled().map(|s| s.duration_minutes), Some(5));
    }

    #[test]
    fn test_alarm_json_shape() {
        let alarm = draft("06:30").into_alarm(1, &defaults()).unwrap();
        let v = serde_json::to_value(&alarm).unwrap();
        assert_eq!(v["time"], "06:30");
        assert_eq!(v["location"], "Current Location");
        assert_eq!(v["repeat"][0], "Never");
        assert_eq!(v["condition"]["operator"], "lt");
    }
}
