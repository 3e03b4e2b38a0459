//! Ringing state machine.
//!
//! ```text
//!            tick: alarm due + condition met
//!   Idle ────────────────────────────────────▶ Ringing
//!    ▲                                            │
//!    └──────────── stop / snooze ─────────────────┘
//!         (or straight to the next queued ring)
//! ```

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

use super::condition::Condition;
use super::model::{Alarm, TimeOfDay};
use super::scheduler::{AlarmScheduler, MinuteGate};
use crate::state::AppState;

/// An alarm that rang, with the instant it started ringing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingEvent {
    pub alarm: Alarm,
    pub since: DateTime<Utc>,
}

impl RingEvent {
    pub fn sound(&self) -> &str {
        &self.alarm.sound
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClockState {
    Idle,
    Ringing(RingEvent),
}

/// Why a snooze request was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnoozeError {
    #[error("no alarm is ringing")]
    NotRinging,
    #[error("snooze is not enabled for alarm {0}")]
    Disabled(u64),
}

/// Drives alarms from the scheduler into the ringing state.
#[derive(Debug)]
pub struct AlarmClock<Tz: TimeZone = Local> {
    scheduler: AlarmScheduler<Tz>,
    gate: MinuteGate,
    synced_revision: Option<u64>,
    state: ClockState,
    pending: VecDeque<RingEvent>,
}

impl AlarmClock<Local> {
    pub fn new(missed_fire_grace_secs: u32) -> Self {
        Self::with_scheduler(AlarmScheduler::new(missed_fire_grace_secs))
    }
}

impl<Tz: TimeZone> AlarmClock<Tz> {
    pub fn with_scheduler(scheduler: AlarmScheduler<Tz>) -> Self {
        Self {
            scheduler,
            gate: MinuteGate::new(),
            synced_revision: None,
            state: ClockState::Idle,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &ClockState {
        &self.state
    }

    pub fn is_ringing(&self) -> bool {
        matches!(self.state, ClockState::Ringing(_))
    }

    /// Rings waiting behind the current one.
    pub fn pending(&self) -> impl Iterator<Item = &RingEvent> {
        self.pending.iter()
    }

    pub fn scheduler(&self) -> &AlarmScheduler<Tz> {
        &self.scheduler
    }

    /// Advance the clock to `now`.
    ///
    /// Resyncs the schedule whenever the alarm list changed, then (once per
    /// minute) rings every due alarm whose condition holds for its
    /// location. One-shot alarms are deactivated when they ring.
    pub fn tick(&mut self, app: &mut AppState, now: DateTime<Utc>) -> Vec<RingEvent> {
        let revision = app.alarm_revision();
        if self.synced_revision != Some(revision) {
            let origin = self.gate.schedule_origin(now);
            self.scheduler.reschedule(app.alarms(), origin);
            self.synced_revision = Some(revision);
        }

        if !self.gate.admit(now) {
            return Vec::new();
        }

        let standard = app.settings().standard;
        let mut rung = Vec::new();

        for id in self.scheduler.due(now) {
            let Some(alarm) = app.alarm(id).filter(|a| a.active).cloned() else {
                continue;
            };

            let met = app
                .resolve_location(&alarm.location)
                .and_then(|loc| alarm.condition.is_met(loc, standard));

            match met {
                Some(true) => {}
                Some(false) => {
                    debug!(alarm_id = id, condition = %alarm.condition, "Alarm condition not met");
                    continue;
                }
                None => {
                    debug!(alarm_id = id, location = %alarm.location, "No live data for alarm condition");
                    continue;
                }
            }

            if alarm.is_one_shot() {
                app.deactivate_alarm(id);
            }

            info!(alarm_id = id, label = %alarm.label, sound = %alarm.sound, "Alarm fired");
            let event = RingEvent { alarm, since: now };
            self.ring(event.clone());
            rung.push(event);
        }

        rung
    }

    fn ring(&mut self, event: RingEvent) {
        if self.is_ringing() {
            self.pending.push_back(event);
        } else {
            self.state = ClockState::Ringing(event);
        }
    }

    fn advance(&mut self) -> Option<RingEvent> {
        let next = self
            .pending
            .pop_front()
            .map_or(ClockState::Idle, ClockState::Ringing);
        match std::mem::replace(&mut self.state, next) {
            ClockState::Ringing(event) => Some(event),
            ClockState::Idle => None,
        }
    }

    /// Silence the ringing alarm. Returns the ring that was stopped.
    pub fn stop(&mut self) -> Option<RingEvent> {
        let stopped = self.advance();
        if let Some(event) = &stopped {
            info!(alarm_id = event.alarm.id, "Alarm stopped");
        }
        stopped
    }

    /// Snooze the ringing alarm, creating a one-shot alarm `duration`
    /// minutes from `now`.
    pub fn snooze(&mut self, app: &mut AppState, now: DateTime<Utc>) -> Result<Alarm, SnoozeError> {
        let ClockState::Ringing(event) = &self.state else {
            return Err(SnoozeError::NotRinging);
        };
        let Some(snooze) = event.alarm.snooze_enabled() else {
            return Err(SnoozeError::Disabled(event.alarm.id));
        };

        let wake = (now + Duration::minutes(i64::from(snooze.duration_minutes)))
            .with_timezone(self.scheduler.timezone());
        let time = TimeOfDay::from_naive(wake.time());
        let condition = if snooze.retain_settings {
            event.alarm.condition.clone()
        } else {
            Condition::always()
        };

        let snoozed = app.spawn_snoozed(&event.alarm, time, condition);
        info!(
            alarm_id = event.alarm.id,
            snoozed_id = snoozed.id,
            time = %snoozed.time,
            "Alarm snoozed"
        );
        self.advance();
        Ok(snoozed)
    }
}
