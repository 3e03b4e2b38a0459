//! Threshold alarms.
//!
//! An alarm watches one metric at one location and rings at a time of day
//! when its condition holds. Scheduling works on absolute fire instants
//! (see [`AlarmScheduler`]); [`AlarmClock`] turns due alarms into rings and
//! handles stop and snooze.

mod clock;
mod condition;
mod model;
mod scheduler;
mod sink;

pub use clock::{AlarmClock, ClockState, RingEvent, SnoozeError};
pub use condition::{evaluate, Condition, Metric, Operator, ALWAYS_TRUE_THRESHOLD};
pub use model::{
    Alarm, AlarmDefaults, AlarmDraft, AlarmError, LocationRef, Repeat, SnoozeConfig, TimeOfDay,
    CURRENT_LOCATION, MAX_SNOOZE_MINUTES,
};
pub use scheduler::{AlarmScheduler, MinuteGate};
pub use sink::{AlarmSink, LogSink};
