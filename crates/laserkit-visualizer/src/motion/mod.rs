//! Motion planning
//!
//! Time-sampled trapezoidal profiles for straight moves.

pub mod profile;

pub use profile::{plan, MotionProfile, MotionSample, MotionSegment, Samples, MAX_SAMPLES_PER_MOVE};
