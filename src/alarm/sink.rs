//! Consumers of ring events.

use tracing::info;

use super::clock::RingEvent;

/// Receives alarms as they start ringing. Implementations hand the sound
/// identifier to whatever plays audio.
pub trait AlarmSink: Send + Sync {
    fn ring(&self, event: &RingEvent);
}

/// Writes ring events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlarmSink for LogSink {
    fn ring(&self, event: &RingEvent) {
        info!(
            alarm_id = event.alarm.id,
            label = %event.alarm.label,
            location = %event.alarm.location,
            sound = %event.sound(),
            since = %event.since,
            "RINGING"
        );
    }
}
