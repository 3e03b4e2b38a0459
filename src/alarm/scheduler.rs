//! Next-fire scheduling for alarms.
//!
//! Each active alarm has one pending fire instant. `due()` hands out the
//! alarms whose instant has passed and immediately moves them to their
//! following occurrence, so a minute can fire an alarm at most once no
//! matter how often the scheduler is polled.
//!
//! Local wall-clock times are resolved through the scheduler's time zone:
//! ambiguous times (clocks going back) fire at the earliest instance, and
//! times that do not exist (clocks going forward) skip that day.

use chrono::{DateTime, Datelike, Days, Duration, Local, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::model::{Alarm, Repeat, TimeOfDay};

/// A week plus one day covers every repeat pattern, including a single
/// weekday whose time already passed today.
const SEARCH_DAYS: u64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    time: TimeOfDay,
    repeat: Repeat,
    next: DateTime<Utc>,
}

/// Pending fire instants keyed by alarm id.
#[derive(Debug)]
pub struct AlarmScheduler<Tz: TimeZone = Local> {
    tz: Tz,
    grace: Duration,
    entries: BTreeMap<u64, Entry>,
}

impl AlarmScheduler<Local> {
    pub fn new(missed_fire_grace_secs: u32) -> Self {
        Self::with_timezone(Local, missed_fire_grace_secs)
    }
}

impl<Tz: TimeZone> AlarmScheduler<Tz> {
    pub fn with_timezone(tz: Tz, missed_fire_grace_secs: u32) -> Self {
        Self {
            tz,
            grace: Duration::seconds(i64::from(missed_fire_grace_secs)),
            entries: BTreeMap::new(),
        }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Next pending fire instant for an alarm, if scheduled.
    pub fn next_fire(&self, id: u64) -> Option<DateTime<Utc>> {
        self.entries.get(&id).map(|e| e.next)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First occurrence of the alarm's time strictly after `after`.
    pub fn next_fire_after(&self, alarm: &Alarm, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.occurrence_after(alarm.time, &alarm.repeat, after)
    }

    fn occurrence_after(
        &self,
        time: TimeOfDay,
        repeat: &Repeat,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let start = after.with_timezone(&self.tz).date_naive();

        (0..SEARCH_DAYS)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .filter(|date| repeat.includes(date.weekday()))
            .filter_map(|date| {
                self.tz
                    .from_local_datetime(&date.and_time(time.as_naive()))
                    .earliest()
            })
            .map(|candidate| candidate.with_timezone(&Utc))
            .find(|candidate| *candidate > after)
    }

    /// Bring the entries in line with the alarm list.
    ///
    /// Inactive and deleted alarms are dropped. Alarms whose time and
    /// repeat are unchanged keep their pending instant; everything else is
    /// scheduled from `now`.
    pub fn reschedule(&mut self, alarms: &[Alarm], now: DateTime<Utc>) {
        self.entries
            .retain(|id, _| alarms.iter().any(|a| a.id == *id && a.active));

        for alarm in alarms.iter().filter(|a| a.active) {
            let unchanged = self
                .entries
                .get(&alarm.id)
                .is_some_and(|e| e.time == alarm.time && e.repeat == alarm.repeat);
            if unchanged {
                continue;
            }

            match self.next_fire_after(alarm, now) {
                Some(next) => {
                    debug!(alarm_id = alarm.id, next = %next, "Alarm scheduled");
                    self.entries.insert(
                        alarm.id,
                        Entry {
                            time: alarm.time,
                            repeat: alarm.repeat.clone(),
                            next,
                        },
                    );
                }
                None => {
                    warn!(alarm_id = alarm.id, time = %alarm.time, "No upcoming fire time for alarm");
                    self.entries.remove(&alarm.id);
                }
            }
        }
    }

    /// Alarms whose fire instant is at or before `now`.
    ///
    /// Every returned alarm is advanced past the instant it fired for.
    /// Fires later than the grace period are skipped with a warning and
    /// rescheduled after `now`.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<u64> {
        let ready: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, e)| e.next <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut fired = Vec::with_capacity(ready.len());
        for id in ready {
            let Some(entry) = self.entries.get(&id).cloned() else {
                continue;
            };

            let lateness = now - entry.next;
            let resume_after = if lateness > self.grace {
                warn!(
                    alarm_id = id,
                    scheduled = %entry.next,
                    late_secs = lateness.num_seconds(),
                    "Missed alarm fire skipped"
                );
                now
            } else {
                fired.push(id);
                entry.next
            };

            match self.occurrence_after(entry.time, &entry.repeat, resume_after) {
                Some(next) => {
                    if let Some(e) = self.entries.get_mut(&id) {
                        e.next = next;
                    }
                }
                None => {
                    self.entries.remove(&id);
                }
            }
        }
        fired
    }
}

/// Admits one evaluation pass per wall-clock minute.
#[derive(Debug, Default, Clone)]
pub struct MinuteGate {
    last_minute: Option<i64>,
}

impl MinuteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time it is called within a given minute.
    pub fn admit(&mut self, now: DateTime<Utc>) -> bool {
        let minute = now.timestamp().div_euclid(60);
        if self.last_minute == Some(minute) {
            return false;
        }
        self.last_minute = Some(minute);
        true
    }

    /// Whether the minute containing `now` has already had its pass.
    pub fn evaluated(&self, now: DateTime<Utc>) -> bool {
        self.last_minute == Some(now.timestamp().div_euclid(60))
    }

    /// Instant new schedule entries are computed from.
    ///
    /// Until the minute containing `now` has been evaluated, an alarm set
    /// for that very minute is still ahead, so scheduling starts just
    /// before the minute began.
    pub fn schedule_origin(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if self.evaluated(now) {
            return now;
        }
        DateTime::from_timestamp(now.timestamp().div_euclid(60) * 60, 0)
            .map_or(now, |start| start - Duration::nanoseconds(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{Condition, LocationRef};
    use chrono::{FixedOffset, Weekday};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn alarm(id: u64, time: &str, repeat: Repeat) -> Alarm {
        Alarm {
            id,
            time: time.parse().unwrap(),
            label: String::new(),
            location: LocationRef::Current,
            condition: Condition::always(),
            repeat,
            sound: "chime".to_string(),
            active: true,
            snooze: None,
        }
    }

    #[test]
    fn test_next_fire_later_today() {
        let s = AlarmScheduler::with_timezone(Utc, 120);
        let a = alarm(1, "07:30", Repeat::Never);
        // 2026-10-19 is a Monday
        let next = s.next_fire_after(&a, utc("2026-10-19T06:00:00Z"));
        assert_eq!(next, Some(utc("2026-10-19T07:30:00Z")));
    }

    #[test]
    fn test_next_fire_is_strictly_after() {
        let s = AlarmScheduler::with_timezone(Utc, 120);
        let a = alarm(1, "07:30", Repeat::Never);
        let next = s.next_fire_after(&a, utc("2026-10-19T07:30:00Z"));
        assert_eq!(next, Some(utc("2026-10-20T07:30:00Z")));
    }

    #[test]
    fn test_next_fire_respects_weekdays() {
        let s = AlarmScheduler::with_timezone(Utc, 120);
        let a = alarm(1, "07:30", Repeat::days([Weekday::Mon]));
        // Monday after the time: wait a full week
        let next = s.next_fire_after(&a, utc("2026-10-19T08:00:00Z"));
        assert_eq!(next, Some(utc("2026-10-26T07:30:00Z")));

        let b = alarm(2, "07:30", Repeat::days([Weekday::Wed, Weekday::Fri]));
        let next = s.next_fire_after(&b, utc("2026-10-19T08:00:00Z"));
        assert_eq!(next, Some(utc("2026-10-21T07:30:00Z")));
    }

    #[test]
    fn test_local_time_uses_timezone() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let s = AlarmScheduler::with_timezone(tz, 120);
        let a = alarm(1, "07:30", Repeat::Never);
        let next = s.next_fire_after(&a, utc("2026-10-19T00:00:00Z"));
        assert_eq!(next, Some(utc("2026-10-19T23:30:00Z")));
    }

    #[test]
    fn test_due_fires_once_per_occurrence() {
        let mut s = AlarmScheduler::with_timezone(Utc, 120);
        let alarms = vec![alarm(1, "07:30", Repeat::daily())];
        s.reschedule(&alarms, utc("2026-10-19T07:00:00Z"));

        assert!(s.due(utc("2026-10-19T07:29:59Z")).is_empty());
        assert_eq!(s.due(utc("2026-10-19T07:30:00Z")), vec![1]);
        assert!(s.due(utc("2026-10-19T07:30:30Z")).is_empty());
        assert_eq!(s.next_fire(1), Some(utc("2026-10-20T07:30:00Z")));
    }

    #[test]
    fn test_missed_fire_beyond_grace_is_skipped() {
        let mut s = AlarmScheduler::with_timezone(Utc, 120);
        let alarms = vec![alarm(1, "07:30", Repeat::daily())];
        s.reschedule(&alarms, utc("2026-10-19T07:00:00Z"));

        // Clock jumped forward an hour
        assert!(s.due(utc("2026-10-19T08:30:00Z")).is_empty());
        assert_eq!(s.next_fire(1), Some(utc("2026-10-20T07:30:00Z")));
    }

    #[test]
    fn test_late_fire_within_grace_still_rings() {
        let mut s = AlarmScheduler::with_timezone(Utc, 120);
        let alarms = vec![alarm(1, "07:30", Repeat::daily())];
        s.reschedule(&alarms, utc("2026-10-19T07:00:00Z"));
        assert_eq!(s.due(utc("2026-10-19T07:31:00Z")), vec![1]);
    }

    #[test]
    fn test_reschedule_keeps_unchanged_and_drops_inactive() {
        let mut s = AlarmScheduler::with_timezone(Utc, 120);
        let mut alarms = vec![
            alarm(1, "07:30", Repeat::daily()),
            alarm(2, "08:00", Repeat::daily()),
        ];
        s.reschedule(&alarms, utc("2026-10-19T07:00:00Z"));
        assert_eq!(s.len(), 2);

        // Rescheduling later must not push alarm 1 past its pending time
        alarms[1].active = false;
        s.reschedule(&alarms, utc("2026-10-19T07:30:00.500Z"));
        assert_eq!(s.next_fire(1), Some(utc("2026-10-19T07:30:00Z")));
        assert_eq!(s.next_fire(2), None);

        // Editing the time recomputes from now
        alarms[0].time = "09:00".parse().unwrap();
        s.reschedule(&alarms, utc("2026-10-19T07:31:00Z"));
        assert_eq!(s.next_fire(1), Some(utc("2026-10-19T09:00:00Z")));
    }

    #[test]
    fn test_minute_gate() {
        let mut gate = MinuteGate::new();
        assert!(gate.admit(utc("2026-10-19T07:30:00.100Z")));
        assert!(!gate.admit(utc("2026-10-19T07:30:59.900Z")));
        assert!(gate.admit(utc("2026-10-19T07:31:00Z")));
    }

    #[test]
    fn test_schedule_origin_reaches_back_to_unevaluated_minute() {
        let mut gate = MinuteGate::new();
        gate.admit(utc("2026-10-19T06:59:59Z"));

        // 07:00 has not had its pass yet
        let origin = gate.schedule_origin(utc("2026-10-19T07:00:00.000Z"));
        assert!(origin < utc("2026-10-19T07:00:00Z"));
        assert!(origin > utc("2026-10-19T06:59:59.999Z"));

        let s = AlarmScheduler::with_timezone(Utc, 120);
        let a = alarm(1, "07:00", Repeat::Never);
        assert_eq!(s.next_fire_after(&a, origin), Some(utc("2026-10-19T07:00:00Z")));

        // Once evaluated, the current instant is the origin
        gate.admit(utc("2026-10-19T07:00:00.000Z"));
        let now = utc("2026-10-19T07:00:30Z");
        assert_eq!(gate.schedule_origin(now), now);
    }
}
