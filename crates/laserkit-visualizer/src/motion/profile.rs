//! Trapezoidal velocity profile for a single straight move
//!
//! A move accelerates at a constant rate to the target speed, cruises, then
//! decelerates to rest at the end point. When the move is too short to reach
//! the target speed the cruise phase disappears and the profile becomes
//! triangular with a peak speed of `sqrt(a * S)`.
//!
//! Units are whatever the caller uses consistently (the simulator passes mm,
//! mm/s and mm/s²). Planning is pure: the same inputs always produce the same
//! samples.

use std::iter::FusedIterator;

use laserkit_core::{MotionError, Point};
use serde::{Deserialize, Serialize};

/// Upper bound on samples for one move, guards against absurd tick values
pub const MAX_SAMPLES_PER_MOVE: usize = 1_000_000;

/// One interpolated position along a move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Tool position
    pub position: Point,
    /// Seconds since the start of the move
    pub elapsed: f64,
}

/// Computed phases of a trapezoidal move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    start: Point,
    end: Point,
    direction: Point,
    distance: f64,
    acceleration: f64,
    peak_speed: f64,
    t1: f64,
    t2: f64,
    t3: f64,
    s1: f64,
    s2: f64,
    s3: f64,
}

impl MotionProfile {
    /// Plan the phases of a move from `start` to `end`
    ///
    /// # Errors
    /// Returns [`MotionError`] when `speed` or `acceleration` is not a
    /// positive finite number, or when either point is not finite.
    pub fn new(
        start: Point,
        end: Point,
        speed: f64,
        acceleration: f64,
    ) -> Result<Self, MotionError> {
        check_positive("speed", speed)?;
        check_positive("acceleration", acceleration)?;
        if !start.is_finite() || !end.is_finite() {
            return Err(MotionError::NonFiniteCoordinate {
                from: start.to_string(),
                to: end.to_string(),
            });
        }

        let delta = end - start;
        let distance = delta.length();
        let Some(direction) = delta.normalized() else {
            return Ok(Self {
                start,
                end,
                direction: Point::ORIGIN,
                distance: 0.0,
                acceleration,
                peak_speed: 0.0,
                t1: 0.0,
                t2: 0.0,
                t3: 0.0,
                s1: 0.0,
                s2: 0.0,
                s3: 0.0,
            });
        };

        let mut peak_speed = speed;
        let mut t1 = speed / acceleration;
        let mut s1 = 0.5 * acceleration * t1 * t1;
        let mut s2 = distance - 2.0 * s1;

        if s2 < 0.0 {
            peak_speed = (acceleration * distance).sqrt();
            t1 = peak_speed / acceleration;
            s1 = 0.5 * acceleration * t1 * t1;
            s2 = 0.0;
        }

        let t2 = if s2 > 0.0 { s2 / peak_speed } else { 0.0 };

        Ok(Self {
            start,
            end,
            direction,
            distance,
            acceleration,
            peak_speed,
            t1,
            t2,
            t3: t1,
            s1,
            s2,
            s3: s1,
        })
    }

    /// Start point
    pub fn start(&self) -> Point {
        self.start
    }

    /// End point
    pub fn end(&self) -> Point {
        self.end
    }

    /// Straight-line length of the move
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Acceleration used for both ramps
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Highest speed reached; the target speed unless the profile is triangular
    pub fn peak_speed(&self) -> f64 {
        self.peak_speed
    }

    /// Acceleration time
    pub fn t1(&self) -> f64 {
        self.t1
    }

    /// Cruise time
    pub fn t2(&self) -> f64 {
        self.t2
    }

    /// Deceleration time
    pub fn t3(&self) -> f64 {
        self.t3
    }

    /// Distance covered while accelerating
    pub fn s1(&self) -> f64 {
        self.s1
    }

    /// Distance covered while cruising
    pub fn s2(&self) -> f64 {
        self.s2
    }

    /// Distance covered while decelerating
    pub fn s3(&self) -> f64 {
        self.s3
    }

    /// Duration of the whole move
    pub fn total_time(&self) -> f64 {
        self.t1 + self.t2 + self.t3
    }

    /// Whether the cruise phase collapsed
    pub fn is_triangular(&self) -> bool {
        self.distance > 0.0 && self.s2 == 0.0
    }

    /// Distance travelled after `t` seconds (clamped to the move)
    pub fn distance_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, self.total_time());
        let a = self.acceleration;
        let cruise_end = self.t1 + self.t2;

        let s = if t <= self.t1 {
            0.5 * a * t * t
        } else if t <= cruise_end {
            self.s1 + self.peak_speed * (t - self.t1)
        } else {
            let td = t - cruise_end;
            self.s1 + self.s2 + self.peak_speed * td - 0.5 * a * td * td
        };
        s.clamp(0.0, self.distance)
    }

    /// Speed after `t` seconds
    pub fn speed_at(&self, t: f64) -> f64 {
        let total = self.total_time();
        if t <= 0.0 || t >= total {
            return 0.0;
        }
        let cruise_end = self.t1 + self.t2;
        if t <= self.t1 {
            self.acceleration * t
        } else if t <= cruise_end {
            self.peak_speed
        } else {
            (self.peak_speed - self.acceleration * (t - cruise_end)).max(0.0)
        }
    }

    /// Tool position after `t` seconds
    pub fn position_at(&self, t: f64) -> Point {
        if t >= self.total_time() {
            return self.end;
        }
        self.start + self.direction * self.distance_at(t)
    }

    /// Number of tick intervals the move is divided into
    ///
    /// Zero for a zero-length move, otherwise `round(T / tick)` and at least 1.
    pub fn interval_count(&self, tick: f64) -> Result<usize, MotionError> {
        check_positive("tick", tick)?;
        if self.distance == 0.0 {
            return Ok(0);
        }
        let intervals = (self.total_time() / tick).round().max(1.0);
        if intervals >= MAX_SAMPLES_PER_MOVE as f64 {
            return Err(MotionError::InvalidParameter {
                name: "tick",
                value: tick,
            });
        }
        Ok(intervals as usize)
    }

    /// Lazily sample the move every `tick` seconds
    ///
    /// The first sample is the start at t=0 and the last is exactly the end
    /// point at the total time.
    pub fn samples(&self, tick: f64) -> Result<Samples, MotionError> {
        let intervals = self.interval_count(tick)?;
        Ok(Samples {
            profile: *self,
            intervals,
            next: 0,
            back: intervals + 1,
        })
    }

    fn sample(&self, index: usize, intervals: usize) -> MotionSample {
        if intervals == 0 {
            return MotionSample {
                position: self.start,
                elapsed: 0.0,
            };
        }
        if index >= intervals {
            return MotionSample {
                position: self.end,
                elapsed: self.total_time(),
            };
        }
        let elapsed = self.total_time() * index as f64 / intervals as f64;
        MotionSample {
            position: self.position_at(elapsed),
            elapsed,
        }
    }
}

/// Iterator over the samples of one move
#[derive(Debug, Clone)]
pub struct Samples {
    profile: MotionProfile,
    intervals: usize,
    next: usize,
    back: usize,
}

impl Iterator for Samples {
    type Item = MotionSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.back {
            return None;
        }
        let sample = self.profile.sample(self.next, self.intervals);
        self.next += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.next;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for Samples {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.profile.sample(self.back, self.intervals))
    }
}

impl ExactSizeIterator for Samples {}

impl FusedIterator for Samples {}

/// A fully sampled move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSegment {
    profile: MotionProfile,
    tick: f64,
    samples: Vec<MotionSample>,
}

impl MotionSegment {
    /// Computed profile phases
    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Sampling interval
    pub fn tick(&self) -> f64 {
        self.tick
    }

    /// All samples in time order
    pub fn samples(&self) -> &[MotionSample] {
        &self.samples
    }

    /// Consume the segment, keeping only its samples
    pub fn into_samples(self) -> Vec<MotionSample> {
        self.samples
    }

    /// Number of samples (intervals + 1)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a segment holds at least its start sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of the move
    pub fn total_time(&self) -> f64 {
        self.profile.total_time()
    }
}

/// Plan and sample a move in one call
pub fn plan(
    start: Point,
    end: Point,
    speed: f64,
    acceleration: f64,
    tick: f64,
) -> Result<MotionSegment, MotionError> {
    let profile = MotionProfile::new(start, end, speed, acceleration)?;
    let samples = profile.samples(tick)?.collect();
    Ok(MotionSegment {
        profile,
        tick,
        samples,
    })
}

fn check_positive(name: &'static str, value: f64) -> Result<(), MotionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MotionError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trapezoid_phases() {
        let profile =
            MotionProfile::new(Point::ORIGIN, Point::new(10.0, 0.0), 2.0, 2.0).unwrap();
        assert_eq!(profile.t1(), 1.0);
        assert_eq!(profile.s1(), 1.0);
        assert_eq!(profile.s2(), 8.0);
        assert_eq!(profile.t2(), 4.0);
        assert_eq!(profile.total_time(), 6.0);
        assert!(!profile.is_triangular());
    }

    #[test]
    fn test_triangular_peak() {
        // s1 would be 25 per ramp for a 10 mm move, so the cruise collapses.
        let profile =
            MotionProfile::new(Point::ORIGIN, Point::new(0.0, 10.0), 10.0, 2.0).unwrap();
        assert!(profile.is_triangular());
        assert!((profile.peak_speed() - 20.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(profile.s1(), profile.s3());
        assert!((profile.s1() + profile.s3() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_is_zero_at_ends() {
        let profile =
            MotionProfile::new(Point::ORIGIN, Point::new(10.0, 0.0), 2.0, 2.0).unwrap();
        assert_eq!(profile.speed_at(0.0), 0.0);
        assert_eq!(profile.speed_at(3.0), 2.0);
        assert_eq!(profile.speed_at(6.0), 0.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let end = Point::new(1.0, 0.0);
        assert!(MotionProfile::new(Point::ORIGIN, end, 0.0, 1.0).is_err());
        assert!(MotionProfile::new(Point::ORIGIN, end, 1.0, -1.0).is_err());
        assert!(MotionProfile::new(Point::ORIGIN, end, f64::NAN, 1.0).is_err());
        let profile = MotionProfile::new(Point::ORIGIN, end, 1.0, 1.0).unwrap();
        assert!(profile.samples(0.0).is_err());
        assert!(profile.samples(f64::INFINITY).is_err());
    }

    #[test]
    fn test_samples_iterate_from_both_ends() {
        let profile =
            MotionProfile::new(Point::ORIGIN, Point::new(10.0, 0.0), 2.0, 2.0).unwrap();
        let mut samples = profile.samples(0.5).unwrap();
        assert_eq!(samples.len(), 13);
        assert_eq!(samples.next_back().unwrap().position, Point::new(10.0, 0.0));
        assert_eq!(samples.next().unwrap().position, Point::ORIGIN);
        assert_eq!(samples.len(), 11);
    }
}
