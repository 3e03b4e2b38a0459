//! Runtime tasks: the alarm tick, periodic refresh, and startup bootstrap.
//!
//! All of them share one [`SharedSession`]. Network fetches always run
//! outside the lock; only the final state update takes the write guard.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alarm::{AlarmClock, AlarmDefaults, AlarmSink};
use crate::config::AppConfig;
use crate::provider::{self, DataProvider, ProviderError};
use crate::state::{AppState, Session, Settings};

pub type SharedSession = Arc<RwLock<Session>>;

/// Fresh session seeded from config.
pub fn new_session(config: &AppConfig) -> SharedSession {
    let settings = Settings {
        standard: config.dashboard.standard,
        time_format: config.dashboard.time_format,
    };
    let defaults = AlarmDefaults::new(
        &config.alarms.default_sound,
        config.alarms.default_snooze_minutes,
    );
    let app = AppState::new(settings, defaults);
    let clock = AlarmClock::new(config.alarms.missed_fire_grace_secs);
    Arc::new(RwLock::new(Session::new(app, clock)))
}

// ============================================================================
// Locations
// ============================================================================

/// Fetch a city and add it to the session. Returns its slide index.
pub async fn add_city(
    session: &SharedSession,
    provider: &dyn DataProvider,
    name: &str,
    is_current: bool,
) -> Result<usize, ProviderError> {
    let standard = session.read().await.app.settings().standard;
    let location = provider::fetch_location(provider, name, is_current, standard, Utc::now()).await?;
    Ok(session.write().await.app.add_location(location))
}

/// Add the configured default city as the current location.
///
/// Failures are logged; the service runs without a current location.
pub async fn bootstrap(session: &SharedSession, provider: &dyn DataProvider, city: &str) {
    if city.trim().is_empty() {
        debug!("No default city configured");
        return;
    }
    match add_city(session, provider, city, true).await {
        Ok(_) => info!(city = %city, "Current location ready"),
        Err(e) => warn!(city = %city, error = %e, "Could not load default city"),
    }
}

/// Outcome of one refresh pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
}

/// Re-fetch every tracked location concurrently. A failed fetch keeps
/// the old data.
pub async fn refresh_all(session: &SharedSession, provider: &dyn DataProvider) -> RefreshReport {
    let (names, standard) = {
        let guard = session.read().await;
        let names: Vec<(String, bool)> = guard
            .app
            .locations()
            .iter()
            .map(|l| (l.name.clone(), l.is_current))
            .collect();
        (names, guard.app.settings().standard)
    };

    let fetches = names.iter().map(|(name, is_current)| {
        provider::fetch_location(provider, name, *is_current, standard, Utc::now())
    });
    let results = futures::future::join_all(fetches).await;

    let mut report = RefreshReport::default();
    let mut guard = session.write().await;
    for ((name, _), result) in names.into_iter().zip(results) {
        match result {
            Ok(mut location) => {
                // Geocoding may canonicalize the name differently; keep ours
                location.name = name.clone();
                match guard.app.replace_location(location) {
                    Ok(()) => report.refreshed += 1,
                    Err(e) => {
                        debug!(location = %name, error = %e, "Location removed during refresh");
                    }
                }
            }
            Err(e) => {
                warn!(location = %name, error = %e, "Refresh failed, keeping previous data");
                report.failed += 1;
            }
        }
    }
    report
}

// ============================================================================
// Background loops
// ============================================================================

/// Drive the alarm clock until cancelled.
pub async fn run_alarm_loop(
    session: SharedSession,
    sink: Arc<dyn AlarmSink>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rings = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(rings, "[AlarmClock] Received shutdown signal");
                return;
            }
            _ = interval.tick() => {
                let rung = session.write().await.tick(Utc::now());
                for event in &rung {
                    sink.ring(event);
                }
                rings += rung.len() as u64;
            }
        }
    }
}

/// Refresh every location on a jittered interval until cancelled.
pub async fn run_refresh_loop(
    session: SharedSession,
    provider: Arc<dyn DataProvider>,
    interval_secs: u64,
    jitter_secs: u64,
    cancel: CancellationToken,
) {
    if interval_secs == 0 {
        info!("[Refresh] Disabled");
        cancel.cancelled().await;
        return;
    }

    loop {
        let jitter = if jitter_secs > 0 {
            use rand::Rng;
            rand::thread_rng().gen_range(0..jitter_secs)
        } else {
            0
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("[Refresh] Received shutdown signal");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(interval_secs + jitter)) => {
                let report = refresh_all(&session, provider.as_ref()).await;
                info!(refreshed = report.refreshed, failed = report.failed, "[Refresh] Pass complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::RingEvent;
    use crate::location::Coordinates;
    use crate::provider::{AirQuality, Place, Weather};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Every request fails.
    struct Unreachable;

    #[async_trait]
    impl DataProvider for Unreachable {
        async fn geocode(&self, _: &str, _: usize) -> Result<Vec<Place>, ProviderError> {
            Err(ProviderError::Malformed("offline".to_string()))
        }
        async fn air_quality(&self, _: Coordinates) -> Result<AirQuality, ProviderError> {
            Err(ProviderError::Malformed("offline".to_string()))
        }
        async fn weather(&self, _: Coordinates) -> Result<Weather, ProviderError> {
            Err(ProviderError::Malformed("offline".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingSink(AtomicUsize);

    impl AlarmSink for CountingSink {
        fn ring(&self, _: &RingEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_bootstrap_failure_leaves_session_empty() {
        let session = new_session(&AppConfig::default());
        bootstrap(&session, &Unreachable, "Shanghai").await;
        bootstrap(&session, &Unreachable, "   ").await;
        assert!(session.read().await.app.locations().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_with_no_locations_is_a_no_op() {
        let session = new_session(&AppConfig::default());
        assert_eq!(refresh_all(&session, &Unreachable).await, RefreshReport::default());
    }

    #[tokio::test]
    async fn test_alarm_loop_stops_on_cancel() {
        let session = new_session(&AppConfig::default());
        let sink = Arc::new(CountingSink::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_alarm_loop(
            session,
            sink.clone(),
            Duration::from_millis(10),
            cancel.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit after cancel")
            .unwrap();
        assert_eq!(sink.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_loop_disabled_waits_for_cancel() {
        let session = new_session(&AppConfig::default());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_refresh_loop(
            session,
            Arc::new(Unreachable),
            0,
            0,
            cancel.clone(),
        ));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit after cancel")
            .unwrap();
    }
}
