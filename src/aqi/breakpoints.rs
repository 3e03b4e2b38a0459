//! Breakpoint tables and the piecewise-linear index conversion.
//!
//! Each standard maps a PM2.5 concentration (µg/m³) onto its index scale
//! through an ordered list of tiers. Within a tier the index is linearly
//! interpolated:
//!
//! ```text
//! index = round((i_high - i_low) / (c_high - c_low) * (value - c_low) + i_low)
//! ```
//!
//! Tables are fixed constants. `validate_tables()` is run once at startup to
//! confirm every table is ascending and contiguous.

use serde::Serialize;
use thiserror::Error;

use super::Standard;

/// One tier of a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakpoint {
    /// Lowest concentration in this tier (inclusive)
    pub c_low: f64,
    /// Highest concentration in this tier (inclusive)
    pub c_high: f64,
    /// Index at `c_low`
    pub i_low: u16,
    /// Index at `c_high`
    pub i_high: u16,
}

const fn bp(c_low: f64, c_high: f64, i_low: u16, i_high: u16) -> Breakpoint {
    Breakpoint {
        c_low,
        c_high,
        i_low,
        i_high,
    }
}

// ============================================================================
// Tables
// ============================================================================

/// US EPA PM2.5 breakpoints (pre-2024 revision, 0-500).
const US: [Breakpoint; 7] = [
    bp(0.0, 12.0, 0, 50),       // Good
    bp(12.1, 35.4, 51, 100),    // Moderate
    bp(35.5, 55.4, 101, 150),   // Unhealthy for Sensitive Groups
    bp(55.5, 150.4, 151, 200),  // Unhealthy
    bp(150.5, 250.4, 201, 300), // Very Unhealthy
    bp(250.5, 350.4, 301, 400), // Hazardous
    bp(350.5, 500.4, 401, 500), // Hazardous
];

/// China MEP PM2.5 breakpoints (0-500). Tiers share their boundary value;
/// the lower tier wins.
const CN: [Breakpoint; 7] = [
    bp(0.0, 35.0, 0, 50),
    bp(35.0, 75.0, 51, 100),
    bp(75.0, 115.0, 101, 150),
    bp(115.0, 150.0, 151, 200),
    bp(150.0, 250.0, 201, 300),
    bp(250.0, 350.0, 301, 400),
    bp(350.0, 500.0, 401, 500),
];

/// UK Daily Air Quality Index PM2.5 bands (1-10). Each band is a single
/// index value, so interpolation is flat inside a band.
const UK: [Breakpoint; 10] = [
    bp(0.0, 11.0, 1, 1),
    bp(12.0, 23.0, 2, 2),
    bp(24.0, 35.0, 3, 3),
    bp(36.0, 41.0, 4, 4),
    bp(42.0, 47.0, 5, 5),
    bp(48.0, 53.0, 6, 6),
    bp(54.0, 58.0, 7, 7),
    bp(59.0, 64.0, 8, 8),
    bp(65.0, 70.0, 9, 9),
    bp(71.0, 1000.0, 10, 10),
];

/// India NAQI PM2.5 breakpoints (0-500).
const IN: [Breakpoint; 6] = [
    bp(0.0, 30.0, 0, 50),
    bp(31.0, 60.0, 51, 100),
    bp(61.0, 90.0, 101, 200),
    bp(91.0, 120.0, 201, 300),
    bp(121.0, 250.0, 301, 400),
    bp(250.0, 999.0, 401, 500),
];

/// Largest allowed concentration gap between two successive tiers.
///
/// Published tables jump by one unit of their reporting precision
/// (12.0 → 12.1, 30 → 31), never more.
const MAX_TIER_GAP: f64 = 1.0;

/// Breakpoint table for a standard.
pub fn breakpoints(standard: Standard) -> &'static [Breakpoint] {
    match standard {
        Standard::Us => &US,
        Standard::Cn => &CN,
        Standard::Uk => &UK,
        Standard::In => &IN,
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert a PM2.5 concentration to an index under `standard`.
///
/// - Inside a tier the index is linearly interpolated and rounded.
/// - Above the last tier the standard's maximum index is returned.
/// - Below the first tier (negative or NaN input) the minimum index is
///   returned.
/// - A value that falls in the gap between two tiers (e.g. 12.05 under US)
///   is clamped to the upper tier's low bound.
///
/// ```
/// use airwatch::aqi::{calculate_index, Standard};
///
/// assert_eq!(calculate_index(12.0, Standard::Us), 50);
/// assert_eq!(calculate_index(12.1, Standard::Us), 51);
/// assert_eq!(calculate_index(0.0, Standard::Uk), 1);
/// ```
pub fn calculate_index(concentration: f64, standard: Standard) -> u16 {
    let table = breakpoints(standard);

    let Some(first) = table.first() else {
        return standard.min_index();
    };
    // NaN fails every comparison, so handle it with the below-range clamp.
    if concentration.is_nan() || concentration < first.c_low {
        return first.i_low;
    }

    // Values in the gap between tiers (US 12.05) clamp up to the next tier
    // instead of reading as off the scale.
    for tier in table {
        if concentration <= tier.c_high {
            let value = concentration.max(tier.c_low);
            return interpolate(tier, value);
        }
    }

    standard.max_index()
}

fn interpolate(tier: &Breakpoint, value: f64) -> u16 {
    let span = tier.c_high - tier.c_low;
    if span <= 0.0 {
        return tier.i_low;
    }
    let slope = f64::from(tier.i_high - tier.i_low) / span;
    let index = slope * (value - tier.c_low) + f64::from(tier.i_low);
    index.round() as u16
}

// ============================================================================
// Validation
// ============================================================================

/// A breakpoint table that violates the ordering/contiguity invariants.
#[derive(Debug, Error, PartialEq)]
pub enum BreakpointError {
    #[error("{0}: breakpoint table is empty")]
    Empty(Standard),
    #[error("{0}: first tier starts at {1}, expected 0")]
    NonZeroStart(Standard, f64),
    #[error("{standard}: tier {tier} is inverted ({detail})")]
    InvertedTier {
        standard: Standard,
        tier: usize,
        detail: String,
    },
    #[error("{standard}: tier {tier} is not contiguous with the next tier ({detail})")]
    Discontinuous {
        standard: Standard,
        tier: usize,
        detail: String,
    },
    #[error("{standard}: last tier tops out at index {found}, expected {expected}")]
    WrongMaximum {
        standard: Standard,
        found: u16,
        expected: u16,
    },
}

/// Check one table for ordering and contiguity.
pub fn validate_table(standard: Standard) -> Result<(), BreakpointError> {
    let table = breakpoints(standard);
    let first = table.first().ok_or(BreakpointError::Empty(standard))?;
    if first.c_low != 0.0 {
        return Err(BreakpointError::NonZeroStart(standard, first.c_low));
    }
    if first.i_low != standard.min_index() {
        return Err(BreakpointError::InvertedTier {
            standard,
            tier: 0,
            detail: format!(
                "starts at index {}, expected {}",
                first.i_low,
                standard.min_index()
            ),
        });
    }

    for (i, tier) in table.iter().enumerate() {
        if !(tier.c_low < tier.c_high) || tier.i_low > tier.i_high {
            return Err(BreakpointError::InvertedTier {
                standard,
                tier: i,
                detail: format!(
                    "concentration {}..{}, index {}..{}",
                    tier.c_low, tier.c_high, tier.i_low, tier.i_high
                ),
            });
        }
    }

    for (i, pair) in table.windows(2).enumerate() {
        let (lower, upper) = (&pair[0], &pair[1]);
        let gap = upper.c_low - lower.c_high;
        if !(0.0..=MAX_TIER_GAP).contains(&gap) {
            return Err(BreakpointError::Discontinuous {
                standard,
                tier: i,
                detail: format!("concentration gap {gap:.2}"),
            });
        }
        if upper.i_low != lower.i_high && upper.i_low != lower.i_high + 1 {
            return Err(BreakpointError::Discontinuous {
                standard,
                tier: i,
                detail: format!("index jumps {} -> {}", lower.i_high, upper.i_low),
            });
        }
    }

    let last = table.last().map_or(0, |t| t.i_high);
    if last != standard.max_index() {
        return Err(BreakpointError::WrongMaximum {
            standard,
            found: last,
            expected: standard.max_index(),
        });
    }

    Ok(())
}

/// Validate every standard's table. Called once at startup.
pub fn validate_tables() -> Result<(), BreakpointError> {
    Standard::ALL.iter().try_for_each(|s| validate_table(*s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tables_valid() {
        assert_eq!(validate_tables(), Ok(()));
    }

    #[test]
    fn test_us_tier_boundaries() {
        assert_eq!(calculate_index(0.0, Standard::Us), 0);
        assert_eq!(calculate_index(12.0, Standard::Us), 50);
        assert_eq!(calculate_index(12.1, Standard::Us), 51);
        assert_eq!(calculate_index(35.4, Standard::Us), 100);
        assert_eq!(calculate_index(35.5, Standard::Us), 101);
        assert_eq!(calculate_index(55.4, Standard::Us), 150);
        assert_eq!(calculate_index(55.5, Standard::Us), 151);
        assert_eq!(calculate_index(150.4, Standard::Us), 200);
        assert_eq!(calculate_index(150.5, Standard::Us), 201);
        assert_eq!(calculate_index(250.4, Standard::Us), 300);
        assert_eq!(calculate_index(350.5, Standard::Us), 401);
        assert_eq!(calculate_index(500.4, Standard::Us), 500);
    }

    #[test]
    fn test_us_interpolation() {
        // 6.0 is halfway through the first tier
        assert_eq!(calculate_index(6.0, Standard::Us), 25);
        // (49 / 23.3) * (20.0 - 12.1) + 51 = 67.6 -> 68
        assert_eq!(calculate_index(20.0, Standard::Us), 68);
    }

    #[test]
    fn test_cn_shared_boundary_uses_lower_tier() {
        assert_eq!(calculate_index(35.0, Standard::Cn), 50);
        assert_eq!(calculate_index(75.0, Standard::Cn), 100);
        assert_eq!(calculate_index(45.0, Standard::Cn), 63);
    }

    #[test]
    fn test_uk_bands_are_flat() {
        assert_eq!(calculate_index(0.0, Standard::Uk), 1);
        assert_eq!(calculate_index(11.0, Standard::Uk), 1);
        assert_eq!(calculate_index(12.0, Standard::Uk), 2);
        assert_eq!(calculate_index(40.0, Standard::Uk), 4);
        assert_eq!(calculate_index(70.0, Standard::Uk), 9);
        assert_eq!(calculate_index(71.0, Standard::Uk), 10);
        assert_eq!(calculate_index(5000.0, Standard::Uk), 10);
    }

    #[test]
    fn test_in_tiers() {
        assert_eq!(calculate_index(30.0, Standard::In), 50);
        assert_eq!(calculate_index(31.0, Standard::In), 51);
        assert_eq!(calculate_index(90.0, Standard::In), 200);
        assert_eq!(calculate_index(999.0, Standard::In), 500);
    }

    #[test]
    fn test_above_table_returns_max() {
        assert_eq!(calculate_index(500.5, Standard::Us), 500);
        assert_eq!(calculate_index(10_000.0, Standard::Cn), 500);
        assert_eq!(calculate_index(1000.1, Standard::In), 500);
        assert_eq!(calculate_index(f64::INFINITY, Standard::Us), 500);
    }

    #[test]
    fn test_below_table_clamps_to_min() {
        assert_eq!(calculate_index(-3.0, Standard::Us), 0);
        assert_eq!(calculate_index(-3.0, Standard::Uk), 1);
        assert_eq!(calculate_index(f64::NAN, Standard::Cn), 0);
    }

    #[test]
    fn test_gap_between_tiers_clamps_up() {
        assert_eq!(calculate_index(12.05, Standard::Us), 51);
        assert_eq!(calculate_index(11.5, Standard::Uk), 2);
        assert_eq!(calculate_index(30.5, Standard::In), 51);
    }

    #[test]
    fn test_index_is_monotonic() {
        for standard in Standard::ALL {
            let mut previous = 0;
            let mut c = 0.0;
            while c < 1100.0 {
                let index = calculate_index(c, standard);
                assert!(
                    index >= previous,
                    "{standard}: index dropped from {previous} to {index} at {c}"
                );
                previous = index;
                c += 0.05;
            }
        }
    }
}
