//! # LaserKit
//!
//! Motion planning and flow-controlled G-code streaming for USB laser engravers.
//!
//! ## Architecture
//!
//! LaserKit is organized as a workspace with multiple crates:
//!
//! 1. **laserkit-core** - Errors, coordinates, laser state, pending queues
//! 2. **laserkit-visualizer** - G-code decoding, motion profiles, preview simulation
//! 3. **laserkit-communication** - Serial transport, streaming, device sessions
//! 4. **laserkit-settings** - Configuration files
//! 5. **laserkit** - Command-line front end tying the crates together

pub use laserkit_core::{
    ConnectionError, ControllerError, Error, GcodeError, LaserState, MotionError, PendingQueue,
    Point, Result,
};

pub use laserkit_visualizer::{
    plan, program_statistics, AccelerationMode, BurnSegment, Command, CommandKind, Decoded,
    DecodedProgram, DecoderState, GcodeDecoder, GcodeFileReader, MotionMode, MotionProfile,
    MotionSample, MotionSegment, ProgramStatistics, SimulationStep, Simulator, SimulatorConfig,
    SplicePolicy, MAX_POWER,
};

pub use laserkit_communication::{
    default_setup_commands, is_candidate_port, list_all_ports, list_ports, DeviceSession,
    FlowWindow, SerialPortInfo, SessionConfig, StreamConfig, StreamController, StreamStatus,
};

pub use laserkit_settings::{Config, SettingsError};

use std::time::Duration;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Session settings from a loaded config
pub fn session_config(config: &Config) -> SessionConfig {
    SessionConfig {
        baud_rate: config.connection.baud_rate,
        handshake_timeout: Duration::from_millis(config.connection.handshake_timeout_ms),
        poll_timeout: Duration::from_millis(config.connection.poll_timeout_ms),
        setup_commands: config
            .device
            .setup_commands
            .clone()
            .unwrap_or_else(default_setup_commands),
        stream: StreamConfig {
            window_limit: config.stream.window_limit,
            idle_backoff: Duration::from_millis(config.stream.idle_backoff_ms),
            read_chunk: config.stream.read_chunk,
        },
    }
}

/// Simulator settings from a loaded config
pub fn simulator_config(config: &Config) -> SimulatorConfig {
    let simulation = &config.simulation;
    SimulatorConfig {
        tick: simulation.tick_seconds,
        acceleration: simulation
            .acceleration
            .map_or(AccelerationMode::MatchSpeed, AccelerationMode::Fixed),
        rapid_feed: simulation.rapid_feed,
        default_feed: simulation.default_feed,
        splice_policy: if simulation.preempt {
            SplicePolicy::Preempt
        } else {
            SplicePolicy::Sequential
        },
    }
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - Console output on stderr, pretty or JSON
/// - RUST_LOG environment variable support
/// - `default_level` when RUST_LOG is unset
pub fn init_logging(default_level: tracing::Level, json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    if json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .json();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
