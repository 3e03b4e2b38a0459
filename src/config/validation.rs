//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! The raw TOML is walked before serde sees it so typos such as
//! `[dashbord]` or `tick_milis` produce a warning with a "did you mean"
//! hint instead of being silently ignored.

use std::collections::HashSet;
use std::fmt;

use super::AppConfig;
use crate::alarm::MAX_SNOOZE_MINUTES;

/// Longest forecast strip the providers can fill (hours).
const MAX_FORECAST_HOURS: usize = 120;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path. Keep in step with `AppConfig`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [server]
        "server",
        "server.addr",
        // [providers]
        "providers",
        "providers.geocoding_url",
        "providers.air_quality_url",
        "providers.weather_url",
        "providers.timeout_secs",
        // [dashboard]
        "dashboard",
        "dashboard.default_city",
        "dashboard.standard",
        "dashboard.time_format",
        "dashboard.forecast_hours",
        "dashboard.refresh_interval_secs",
        "dashboard.refresh_jitter_secs",
        // [alarms]
        "alarms",
        "alarms.tick_millis",
        "alarms.missed_fire_grace_secs",
        "alarms.default_sound",
        "alarms.default_snooze_minutes",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Collect the dotted key paths of a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every unknown key in a raw TOML string.
///
/// Never fails: unparseable TOML returns no warnings and is reported by
/// the serde pass instead.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Range-check a parsed config.
///
/// Returns (errors, warnings): errors prevent startup, warnings are
/// suspicious but usable.
pub fn validate_ranges(config: &AppConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.server.addr.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "server.addr = '{}' is not a valid socket address",
            config.server.addr
        ));
    }

    let p = &config.providers;
    for (field, url) in [
        ("providers.geocoding_url", &p.geocoding_url),
        ("providers.air_quality_url", &p.air_quality_url),
        ("providers.weather_url", &p.weather_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("{field} = '{url}' must be an http(s) URL"));
        }
    }
    if p.timeout_secs == 0 {
        errors.push("providers.timeout_secs must be > 0".to_string());
    }

    let d = &config.dashboard;
    if d.forecast_hours == 0 || d.forecast_hours > MAX_FORECAST_HOURS {
        errors.push(format!(
            "dashboard.forecast_hours = {} is outside 1-{MAX_FORECAST_HOURS}",
            d.forecast_hours
        ));
    }
    if d.refresh_interval_secs > 0 && d.refresh_interval_secs < 60 {
        warnings.push(ValidationWarning {
            field: "dashboard.refresh_interval_secs".to_string(),
            message: format!(
                "dashboard.refresh_interval_secs = {} refreshes more than once a minute; providers update hourly",
                d.refresh_interval_secs
            ),
            suggestion: None,
        });
    }
    if d.default_city.trim().is_empty() {
        warnings.push(ValidationWarning {
            field: "dashboard.default_city".to_string(),
            message: "dashboard.default_city is empty; no current location will be added".to_string(),
            suggestion: None,
        });
    }

    let a = &config.alarms;
    // Ticking slower than the minute would let alarm minutes pass unseen
    if a.tick_millis == 0 || a.tick_millis > 60_000 {
        errors.push(format!(
            "alarms.tick_millis = {} is outside 1-60000",
            a.tick_millis
        ));
    } else if a.tick_millis > 5_000 {
        warnings.push(ValidationWarning {
            field: "alarms.tick_millis".to_string(),
            message: format!(
                "alarms.tick_millis = {} delays alarms by up to that long",
                a.tick_millis
            ),
            suggestion: None,
        });
    }
    if u64::from(a.missed_fire_grace_secs) * 1_000 < a.tick_millis {
        errors.push(format!(
            "alarms.missed_fire_grace_secs = {} is shorter than one tick ({} ms)",
            a.missed_fire_grace_secs, a.tick_millis
        ));
    }
    if a.default_snooze_minutes == 0 || a.default_snooze_minutes > MAX_SNOOZE_MINUTES {
        errors.push(format!(
            "alarms.default_snooze_minutes = {} is outside 1-{MAX_SNOOZE_MINUTES}",
            a.default_snooze_minutes
        ));
    }
    if a.default_sound.trim().is_empty() {
        errors.push("alarms.default_sound must not be empty".to_string());
    }

    (errors, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("alarms", "alarms"), 0);
    }

    #[test]
    fn test_suggests_close_key() {
        let known = known_config_keys();
        assert_eq!(
            suggest_correction("alarms.tick_milis", &known).as_deref(),
            Some("alarms.tick_millis")
        );
        assert_eq!(suggest_correction("totally.unrelated.key", &known), None);
    }

    #[test]
    fn test_unknown_section_warns() {
        let warnings = validate_unknown_keys("[dashbord]\nstandard = \"CN\"\n");
        let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
        assert!(fields.contains(&"dashbord"));
        let w = warnings.iter().find(|w| w.field == "dashbord").unwrap();
        assert_eq!(w.suggestion.as_deref(), Some("dashboard"));
        assert!(w.to_string().contains("did you mean 'dashboard'"));
    }

    #[test]
    fn test_known_keys_do_not_warn() {
        let raw = AppConfig::default().to_toml().unwrap();
        assert!(validate_unknown_keys(&raw).is_empty());
    }

    #[test]
    fn test_defaults_pass_range_checks() {
        let (errors, warnings) = validate_ranges(&AppConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_range_errors_collected() {
        let mut config = AppConfig::default();
        config.server.addr = "not-an-addr".to_string();
        config.alarms.tick_millis = 0;
        config.alarms.default_snooze_minutes = 90;
        config.dashboard.forecast_hours = 0;
        let (errors, _) = validate_ranges(&config);
        assert_eq!(errors.len(), 4, "{errors:?}");
    }
}
