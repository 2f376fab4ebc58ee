//! # LaserKit Visualizer
//!
//! G-code decoding, motion profiling, and preview simulation for LaserKit.
//! Includes the line decoder, the trapezoidal profiler, the tick-driven
//! simulator, and program file helpers.

pub mod gcode;
pub mod motion;
pub mod utils;
pub mod visualizer;

pub use gcode::{
    Command, CommandKind, Decoded, DecodedProgram, DecoderState, GcodeDecoder, MotionMode,
    MAX_POWER,
};

pub use motion::{plan, MotionProfile, MotionSample, MotionSegment, Samples};

pub use utils::{program_statistics, FileEncoding, GcodeFileReader, ProgramStatistics};

pub use visualizer::{
    AccelerationMode, BurnSegment, SimulationStep, Simulator, SimulatorConfig, SplicePolicy,
};
