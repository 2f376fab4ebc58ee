//! Data models for positions and laser state
//!
//! This module provides:
//! - Work-surface coordinates in millimeters
//! - Vector helpers used by the motion profiler
//! - Laser output state shared by the simulator and the UI layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A point (or displacement) on the XY work surface, in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X-axis position
    pub x: f64,
    /// Y-axis position
    pub y: f64,
}

impl Point {
    /// The work-surface origin
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Create a point from its coordinates
    pub fn new(x: f64, y: f64) -> Self {
        debug_assert!(
            x.is_finite() && y.is_finite(),
            "Point coordinates must be finite: x={x}, y={y}"
        );
        Self { x, y }
    }

    /// Check that both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean length when used as a displacement
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (*other - *self).length()
    }

    /// Unit vector in the same direction, or `None` for the zero vector
    pub fn normalized(&self) -> Option<Point> {
        let len = self.length();
        if len > 0.0 {
            Some(Point {
                x: self.x / len,
                y: self.y / len,
            })
        } else {
            None
        }
    }

    /// Check whether two points coincide within `tolerance`
    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3}", self.x, self.y)
    }
}

/// Laser output as observed by the simulator and the UI
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LaserState {
    /// Whether M3 is active
    pub enabled: bool,
    /// Output power in percent (0-100)
    pub power: f64,
}

impl LaserState {
    /// Power actually emitted: zero unless the laser is enabled
    pub fn effective_power(&self) -> f64 {
        if self.enabled {
            self.power
        } else {
            0.0
        }
    }
}
