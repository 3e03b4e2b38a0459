//! Application State
//!
//! Alarms, tracked locations, and user settings for one session. Every
//! mutation goes through an `AppState` method; the service shares a
//! [`Session`] behind a single `tokio::sync::RwLock`.

mod dashboard;

pub use dashboard::{time_label, DashboardView, ForecastBar, Slide};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::alarm::{
    Alarm, AlarmClock, AlarmDefaults, AlarmDraft, AlarmError, Condition, LocationRef, Repeat, RingEvent,
    SnoozeError, TimeOfDay,
};
use crate::aqi::Standard;
use crate::location::Location;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("alarm {0} not found")]
    UnknownAlarm(u64),
    #[error("location index {index} out of range ({len} locations)")]
    InvalidIndex { index: usize, len: usize },
    #[error("location '{0}' not found")]
    UnknownLocation(String),
    #[error("the current location cannot be removed")]
    CannotRemoveCurrent,
    #[error("no location selected")]
    NoLocationSelected,
    #[error(transparent)]
    InvalidAlarm(#[from] AlarmError),
}

// ============================================================================
// Settings
// ============================================================================

/// Clock style for forecast labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "12h")]
    H12,
}

/// User-adjustable display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub standard: Standard,
    pub time_format: TimeFormat,
}

/// Swipe direction on the dashboard slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Swipe {
    /// Towards the next location
    Left,
    /// Towards the previous location
    Right,
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Debug, Clone)]
pub struct AppState {
    /// Alarms in creation order
    alarms: Vec<Alarm>,

    /// Tracked locations; the current location, if any, is always first
    locations: Vec<Location>,

    /// Index of the dashboard slide in view
    selected: usize,

    settings: Settings,

    next_alarm_id: u64,

    /// Bumped on every alarm mutation so the scheduler knows to resync
    alarm_revision: u64,

    /// Sound and snooze length used when a submission leaves them out
    defaults: AlarmDefaults,
}

impl AppState {
    pub fn new(settings: Settings, defaults: AlarmDefaults) -> Self {
        Self {
            alarms: Vec::new(),
            locations: Vec::new(),
            selected: 0,
            settings,
            next_alarm_id: 1,
            alarm_revision: 0,
            defaults,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    // ------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_location(&self) -> Result<&Location, StateError> {
        self.locations
            .get(self.selected)
            .ok_or(StateError::NoLocationSelected)
    }

    /// Add a freshly fetched location and return its index.
    ///
    /// A current location goes to the front, replacing any previous one,
    /// and the selection keeps pointing at the same slide. Any other
    /// location is appended (or replaces one with the same name) and
    /// becomes selected.
    pub fn add_location(&mut self, mut location: Location) -> usize {
        location.recompute(self.settings.standard);

        if location.is_current {
            let had_locations = !self.locations.is_empty();
            if self.locations.first().is_some_and(|l| l.is_current) {
                self.locations[0] = location;
            } else {
                self.locations.insert(0, location);
                if had_locations {
                    self.selected += 1;
                }
            }
            info!(location = %self.locations[0].name, "Current location set");
            return 0;
        }

        let index = match self.find_added(&location.name) {
            Some(i) => {
                self.locations[i] = location;
                i
            }
            None => {
                self.locations.push(location);
                self.locations.len() - 1
            }
        };
        self.selected = index;
        info!(location = %self.locations[index].name, index, "Location added");
        index
    }

    fn find_added(&self, name: &str) -> Option<usize> {
        self.locations
            .iter()
            .position(|l| !l.is_current && l.name.eq_ignore_ascii_case(name))
    }

    /// Replace a location wholesale with refreshed data.
    ///
    /// Matches on name and `is_current`, so an added city sharing the
    /// current location's name is refreshed as its own slide.
    pub fn replace_location(&mut self, mut location: Location) -> Result<(), StateError> {
        let index = if location.is_current {
            self.locations
                .iter()
                .position(|l| l.is_current && l.name.eq_ignore_ascii_case(&location.name))
        } else {
            self.find_added(&location.name)
        }
        .ok_or_else(|| StateError::UnknownLocation(location.name.clone()))?;

        location.recompute(self.settings.standard);
        self.locations[index] = location;
        debug!(location = %self.locations[index].name, "Location refreshed");
        Ok(())
    }

    /// Remove an added location. The current location stays.
    pub fn remove_location(&mut self, index: usize) -> Result<Location, StateError> {
        let location = self.locations.get(index).ok_or(StateError::InvalidIndex {
            index,
            len: self.locations.len(),
        })?;
        if location.is_current {
            return Err(StateError::CannotRemoveCurrent);
        }

        let removed = self.locations.remove(index);
        if self.selected > index {
            self.selected -= 1;
        }
        self.selected = self.selected.min(self.locations.len().saturating_sub(1));
        info!(location = %removed.name, "Location removed");
        Ok(removed)
    }

    pub fn select(&mut self, index: usize) -> Result<(), StateError> {
        if index >= self.locations.len() {
            return Err(StateError::InvalidIndex {
                index,
                len: self.locations.len(),
            });
        }
        self.selected = index;
        Ok(())
    }

    /// Move the selection one slide, stopping at either end.
    pub fn swipe(&mut self, direction: Swipe) -> Result<usize, StateError> {
        if self.locations.is_empty() {
            return Err(StateError::NoLocationSelected);
        }
        self.selected = match direction {
            Swipe::Left => (self.selected + 1).min(self.locations.len() - 1),
            Swipe::Right => self.selected.saturating_sub(1),
        };
        Ok(self.selected)
    }

    /// Location an alarm is bound to.
    pub fn resolve_location(&self, reference: &LocationRef) -> Option<&Location> {
        match reference {
            LocationRef::Current => self.locations.iter().find(|l| l.is_current),
            // An added slide wins; the current one is reachable as `Current`
            LocationRef::Named(name) => self
                .find_added(name)
                .and_then(|i| self.locations.get(i))
                .or_else(|| self.locations.iter().find(|l| l.name.eq_ignore_ascii_case(name))),
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Switch the AQI standard and recompute every location from its raw
    /// concentrations.
    pub fn set_standard(&mut self, standard: Standard) {
        self.settings.standard = standard;
        for location in &mut self.locations {
            location.recompute(standard);
        }
        info!(standard = %standard, "AQI standard changed");
    }

    pub fn set_time_format(&mut self, format: TimeFormat) {
        self.settings.time_format = format;
    }

    // ------------------------------------------------------------------
    // Alarms
    // ------------------------------------------------------------------

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn alarm(&self, id: u64) -> Option<&Alarm> {
        self.alarms.iter().find(|a| a.id == id)
    }

    fn alarm_mut(&mut self, id: u64) -> Result<&mut Alarm, StateError> {
        self.alarms
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StateError::UnknownAlarm(id))
    }

    pub fn alarm_revision(&self) -> u64 {
        self.alarm_revision
    }

    fn alarms_changed(&mut self) {
        self.alarm_revision = self.alarm_revision.wrapping_add(1);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_alarm_id;
        self.next_alarm_id += 1;
        id
    }

    pub fn add_alarm(&mut self, draft: AlarmDraft) -> Result<Alarm, StateError> {
        let alarm = draft.into_alarm(self.next_alarm_id, &self.defaults)?;
        self.allocate_id();
        info!(alarm_id = alarm.id, time = %alarm.time, condition = %alarm.condition, "Alarm created");
        self.alarms.push(alarm.clone());
        self.alarms_changed();
        Ok(alarm)
    }

    /// Replace an alarm's settings. The edited alarm is active.
    pub fn update_alarm(&mut self, id: u64, draft: AlarmDraft) -> Result<Alarm, StateError> {
        let alarm = draft.into_alarm(id, &self.defaults)?;
        let slot = self.alarm_mut(id)?;
        *slot = alarm.clone();
        self.alarms_changed();
        info!(alarm_id = id, time = %alarm.time, "Alarm updated");
        Ok(alarm)
    }

    /// Flip an alarm's active flag. Returns the new value.
    pub fn toggle_alarm(&mut self, id: u64) -> Result<bool, StateError> {
        let alarm = self.alarm_mut(id)?;
        alarm.active = !alarm.active;
        let active = alarm.active;
        self.alarms_changed();
        debug!(alarm_id = id, active, "Alarm toggled");
        Ok(active)
    }

    pub fn delete_alarm(&mut self, id: u64) -> Result<Alarm, StateError> {
        let index = self
            .alarms
            .iter()
            .position(|a| a.id == id)
            .ok_or(StateError::UnknownAlarm(id))?;
        let removed = self.alarms.remove(index);
        self.alarms_changed();
        info!(alarm_id = id, "Alarm deleted");
        Ok(removed)
    }

    pub(crate) fn deactivate_alarm(&mut self, id: u64) {
        if let Ok(alarm) = self.alarm_mut(id) {
            alarm.active = false;
            self.alarms_changed();
        }
    }

    /// Create the one-shot alarm left behind by a snooze.
    pub(crate) fn spawn_snoozed(
        &mut self,
        source: &Alarm,
        time: TimeOfDay,
        condition: Condition,
    ) -> Alarm {
        let alarm = Alarm {
            id: self.allocate_id(),
            time,
            label: source.label.clone(),
            location: source.location.clone(),
            condition,
            repeat: Repeat::Never,
            sound: source.sound.clone(),
            active: true,
            snooze: source.snooze,
        };
        self.alarms.push(alarm.clone());
        self.alarms_changed();
        alarm
    }

    /// Dashboard for every tracked location, with alarm times read in
    /// the server's local time zone.
    pub fn dashboard(&self, now: DateTime<Utc>, forecast_hours: usize) -> DashboardView {
        self.dashboard_in(Local, now, forecast_hours)
    }

    /// Dashboard with alarm times read in `tz`.
    pub fn dashboard_in<Tz: TimeZone>(
        &self,
        tz: Tz,
        now: DateTime<Utc>,
        forecast_hours: usize,
    ) -> DashboardView {
        DashboardView::build(self, tz, now, forecast_hours)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Everything the service shares between tasks and handlers.
#[derive(Debug)]
pub struct Session {
    pub app: AppState,
    pub clock: AlarmClock,
    pub started_at: Instant,
}

impl Session {
    pub fn new(app: AppState, clock: AlarmClock) -> Self {
        Self {
            app,
            clock,
            started_at: Instant::now(),
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<RingEvent> {
        self.clock.tick(&mut self.app, now)
    }

    pub fn stop(&mut self) -> Option<RingEvent> {
        self.clock.stop()
    }

    pub fn snooze(&mut self, now: DateTime<Utc>) -> Result<Alarm, SnoozeError> {
        self.clock.snooze(&mut self.app, now)
    }
}
