//! Preview simulation
//!
//! This module provides:
//! - A tick-driven stepper that animates decoded commands
//! - Acceleration and queue-splicing policies
//! - A record of where the laser emitted

pub mod simulator;

pub use simulator::{
    AccelerationMode, BurnSegment, SimulationStep, Simulator, SimulatorConfig, SplicePolicy,
    DEFAULT_FEED, DEFAULT_RAPID_FEED, DEFAULT_TICK_SECONDS,
};
