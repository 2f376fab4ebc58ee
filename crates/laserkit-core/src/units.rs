//! Feed rate unit conversion
//!
//! G-Code feed rates (`F`) are expressed in mm/min while the motion profiler
//! and the simulator work in seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Feed rate units selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedRateUnits {
    /// Millimeters per minute
    #[default]
    MmPerMin,
    /// Millimeters per second
    MmPerSec,
}

impl fmt::Display for FeedRateUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MmPerMin => write!(f, "mm/min"),
            Self::MmPerSec => write!(f, "mm/sec"),
        }
    }
}

impl FromStr for FeedRateUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm/min" | "mm_per_min" => Ok(Self::MmPerMin),
            "mm/sec" | "mm/s" | "mm_per_sec" => Ok(Self::MmPerSec),
            _ => Err(format!("Unknown feed rate units: {}", s)),
        }
    }
}

/// Convert a G-Code feed rate (mm/min) to mm/s
#[inline]
pub fn mm_per_min_to_mm_per_sec(feed: f64) -> f64 {
    feed / 60.0
}

/// Format feed rate value for display
///
/// * `value_mm_per_min` - Feed rate in mm/min
/// * `units` - Target feed rate units
pub fn format_feed_rate(value_mm_per_min: f64, units: FeedRateUnits) -> String {
    let value = match units {
        FeedRateUnits::MmPerMin => value_mm_per_min,
        FeedRateUnits::MmPerSec => mm_per_min_to_mm_per_sec(value_mm_per_min),
    };
    format!("{:.3}", value)
}
