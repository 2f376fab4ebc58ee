//! Tests for trapezoidal motion planning

use laserkit_core::{MotionError, Point};
use laserkit_visualizer::{plan, MotionProfile};
use proptest::prelude::*;

#[test]
fn test_cruise_scenario_produces_thirteen_samples() {
    let segment = plan(Point::ORIGIN, Point::new(10.0, 0.0), 2.0, 2.0, 0.5).unwrap();
    let profile = segment.profile();

    assert_eq!(profile.t1(), 1.0);
    assert_eq!(profile.t3(), 1.0);
    assert_eq!(profile.s1(), 1.0);
    assert_eq!(profile.s3(), 1.0);
    assert_eq!(profile.s2(), 8.0);
    assert_eq!(profile.t2(), 4.0);
    assert_eq!(segment.total_time(), 6.0);

    let samples = segment.samples();
    assert_eq!(samples.len(), 13);
    assert_eq!(samples[0].position, Point::ORIGIN);
    assert_eq!(samples[0].elapsed, 0.0);
    assert_eq!(samples[12].position, Point::new(10.0, 0.0));
    assert_eq!(samples[12].elapsed, 6.0);

    for pair in samples.windows(2) {
        assert!(pair[1].position.x > pair[0].position.x);
        assert!(pair[1].elapsed > pair[0].elapsed);
    }
    assert!(samples.iter().all(|s| s.position.y == 0.0));
}

#[test]
fn test_zero_length_move_is_single_sample() {
    let p = Point::new(3.0, 4.0);
    let segment = plan(p, p, 10.0, 10.0, 0.1).unwrap();
    assert_eq!(segment.len(), 1);
    assert_eq!(segment.samples()[0].position, p);
    assert_eq!(segment.samples()[0].elapsed, 0.0);
    assert_eq!(segment.total_time(), 0.0);
}

#[test]
fn test_long_tick_still_reaches_end() {
    let segment = plan(Point::ORIGIN, Point::new(0.0, 1.0), 1.0, 1.0, 100.0).unwrap();
    assert_eq!(segment.len(), 2);
    assert_eq!(segment.samples()[1].position, Point::new(0.0, 1.0));
}

#[test]
fn test_diagonal_move_follows_line() {
    let end = Point::new(30.0, 40.0);
    let segment = plan(Point::ORIGIN, end, 10.0, 20.0, 0.05).unwrap();
    for sample in segment.samples() {
        // Every sample lies on y = 4/3 x.
        assert!((sample.position.y - sample.position.x * 4.0 / 3.0).abs() < 1e-9);
    }
    assert_eq!(segment.samples().last().unwrap().position, end);
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let end = Point::new(1.0, 1.0);
    assert!(matches!(
        plan(Point::ORIGIN, end, -1.0, 1.0, 0.1),
        Err(MotionError::InvalidParameter { name: "speed", .. })
    ));
    assert!(matches!(
        plan(Point::ORIGIN, end, 1.0, 0.0, 0.1),
        Err(MotionError::InvalidParameter {
            name: "acceleration",
            ..
        })
    ));
    assert!(matches!(
        plan(Point::ORIGIN, end, 1.0, 1.0, f64::NAN),
        Err(MotionError::InvalidParameter { name: "tick", .. })
    ));
    assert!(matches!(
        plan(Point::ORIGIN, end, 1.0, 1.0, 1e-12),
        Err(MotionError::InvalidParameter { name: "tick", .. })
    ));
}

fn coordinate() -> impl Strategy<Value = f64> {
    -250.0..250.0f64
}

proptest! {
    #[test]
    fn prop_first_and_last_samples(
        sx in coordinate(), sy in coordinate(),
        ex in coordinate(), ey in coordinate(),
        speed in 1.0..500.0f64,
        accel in 1.0..5000.0f64,
        tick in 0.01..1.0f64,
    ) {
        let start = Point::new(sx, sy);
        let end = Point::new(ex, ey);
        let segment = plan(start, end, speed, accel, tick).unwrap();
        let samples = segment.samples();

        prop_assert_eq!(samples[0].position, start);
        prop_assert_eq!(samples[0].elapsed, 0.0);
        let last = samples[samples.len() - 1];
        prop_assert_eq!(last.position, end);
        prop_assert_eq!(last.elapsed, segment.total_time());
    }

    #[test]
    fn prop_triangular_profiles_are_symmetric(
        distance in 0.01..200.0f64,
        speed in 1.0..500.0f64,
        accel in 1.0..5000.0f64,
    ) {
        let profile = MotionProfile::new(
            Point::ORIGIN,
            Point::new(distance, 0.0),
            speed,
            accel,
        ).unwrap();

        prop_assert_eq!(profile.s1(), profile.s3());
        prop_assert_eq!(profile.t1(), profile.t3());
        prop_assert!(profile.peak_speed() <= speed + 1e-9);
        if profile.is_triangular() {
            prop_assert_eq!(profile.s2(), 0.0);
            prop_assert!((profile.s1() + profile.s3() - distance).abs() < 1e-9 * distance.max(1.0));
        }
    }

    #[test]
    fn prop_progress_is_monotonic_and_speed_bounded(
        distance in 0.01..200.0f64,
        speed in 1.0..500.0f64,
        accel in 1.0..5000.0f64,
        tick in 0.01..1.0f64,
    ) {
        let profile = MotionProfile::new(
            Point::ORIGIN,
            Point::new(0.0, distance),
            speed,
            accel,
        ).unwrap();

        let mut previous = 0.0;
        for sample in profile.samples(tick).unwrap() {
            let s = sample.position.y;
            prop_assert!(s + 1e-9 >= previous);
            prop_assert!(profile.speed_at(sample.elapsed) <= speed + 1e-9);
            previous = s;
        }
    }

    #[test]
    fn prop_planning_is_idempotent(
        ex in coordinate(), ey in coordinate(),
        speed in 1.0..500.0f64,
        accel in 1.0..5000.0f64,
        tick in 0.01..1.0f64,
    ) {
        let end = Point::new(ex, ey);
        let first = plan(Point::ORIGIN, end, speed, accel, tick).unwrap();
        let second = plan(Point::ORIGIN, end, speed, accel, tick).unwrap();
        prop_assert_eq!(first, second);
    }
}
