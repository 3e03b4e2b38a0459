//! Air Quality Index standards, conversion, and health categories.
//!
//! ## Standards
//!
//! | Standard | Scale | Source |
//! |---|---|---|
//! | `US` | 0-500 | EPA |
//! | `CN` | 0-500 | China MEP |
//! | `UK` | 1-10 | DAQI |
//! | `IN` | 0-500 | India NAQI |
//!
//! All conversions use PM2.5 as the driving pollutant.

mod breakpoints;

pub use breakpoints::{
    breakpoints, calculate_index, validate_table, validate_tables, Breakpoint, BreakpointError,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pollutant reported as the dashboard's primary driver.
pub const PRIMARY_POLLUTANT: &str = "PM2.5";

// ============================================================================
// Standard
// ============================================================================

/// National AQI standard used to convert concentrations to an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Standard {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "CN")]
    Cn,
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "IN")]
    In,
}

impl Standard {
    pub const ALL: [Standard; 4] = [Standard::Us, Standard::Cn, Standard::Uk, Standard::In];

    /// Short code ("US", "CN", "UK", "IN").
    pub fn code(self) -> &'static str {
        match self {
            Standard::Us => "US",
            Standard::Cn => "CN",
            Standard::Uk => "UK",
            Standard::In => "IN",
        }
    }

    /// Lowest index on this standard's scale.
    pub fn min_index(self) -> u16 {
        match self {
            Standard::Uk => 1,
            _ => 0,
        }
    }

    /// Highest index on this standard's scale. Concentrations beyond the
    /// last tier report this value.
    pub fn max_index(self) -> u16 {
        match self {
            Standard::Uk => 10,
            _ => 500,
        }
    }

    /// Parse a standard code, falling back to US for anything unknown.
    pub fn parse_or_default(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }

    /// Health category for an index on this standard's scale.
    pub fn category(self, index: u16) -> Category {
        match self {
            Standard::Uk => match index {
                0..=3 => Category::Good,
                4..=6 => Category::Moderate,
                7..=9 => Category::Unhealthy,
                _ => Category::Hazardous,
            },
            _ => match index {
                0..=50 => Category::Good,
                51..=100 => Category::Moderate,
                101..=150 => Category::UnhealthySensitive,
                151..=200 => Category::Unhealthy,
                201..=300 => Category::VeryUnhealthy,
                _ => Category::Hazardous,
            },
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Unknown standard code.
#[derive(Debug, thiserror::Error)]
#[error("unknown AQI standard '{0}' (expected US, CN, UK or IN)")]
pub struct UnknownStandard(pub String);

impl FromStr for Standard {
    type Err = UnknownStandard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Standard::Us),
            "CN" => Ok(Standard::Cn),
            "UK" => Ok(Standard::Uk),
            "IN" => Ok(Standard::In),
            _ => Err(UnknownStandard(s.to_string())),
        }
    }
}

// ============================================================================
// Category
// ============================================================================

/// Health category of an index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl Category {
    /// Status label shown next to the index.
    pub fn label(self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Moderate => "Moderate",
            Category::UnhealthySensitive => "Unhealthy (Sens.)",
            Category::Unhealthy => "Unhealthy",
            Category::VeryUnhealthy => "Very Unhealthy",
            Category::Hazardous => "Hazardous",
        }
    }

    /// Display color as a hex string.
    pub fn color(self) -> &'static str {
        match self {
            Category::Good => "#00e400",
            Category::Moderate => "#ffff00",
            Category::UnhealthySensitive => "#ff7e00",
            Category::Unhealthy => "#ff0000",
            Category::VeryUnhealthy => "#8f3f97",
            Category::Hazardous => "#7e0023",
        }
    }
}

// ============================================================================
// Reading
// ============================================================================

/// An index value with everything a renderer needs to display it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub standard: Standard,
    pub index: u16,
    pub category: Category,
    pub status: &'static str,
    pub color: &'static str,
}

impl Reading {
    /// Convert a PM2.5 concentration into a reading.
    pub fn from_concentration(concentration: f64, standard: Standard) -> Self {
        Self::from_index(calculate_index(concentration, standard), standard)
    }

    /// Wrap an already computed index.
    pub fn from_index(index: u16, standard: Standard) -> Self {
        let category = standard.category(index);
        Self {
            standard,
            index,
            category,
            status: category.label(),
            color: category.color(),
        }
    }
}

/// Forecast bar height as a percentage of the standard's full scale.
pub fn bar_height_percent(index: u16, standard: Standard) -> f64 {
    let max = f64::from(standard.max_index());
    (f64::from(index) / max * 100.0).min(100.0)
}
