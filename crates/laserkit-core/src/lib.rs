//! # LaserKit Core
//!
//! Core types and utilities for LaserKit.
//! Provides the error taxonomy, work-surface coordinates, feed-rate units
//! and the pending-action queue shared by the simulator and the streamer.

pub mod data;
pub mod error;
pub mod queue;
pub mod types;
pub mod units;

pub use data::{LaserState, Point};

pub use error::{ConnectionError, ControllerError, Error, GcodeError, MotionError, Result};

pub use queue::PendingQueue;

// Re-export type aliases for convenience
pub use types::{thread_safe, thread_safe_rw, ThreadSafe, ThreadSafeRw};
