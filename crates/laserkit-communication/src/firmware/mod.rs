//! Engraver firmware protocol
//!
//! - Identification handshake (`$I` -> `[MODEL:<name>]`)
//! - Vendor setup lines (pulse width, axis inversion, process parameters)
//! - Device sessions built on the stream controller

pub mod handshake;
pub mod session;

pub use handshake::{
    default_setup_commands, discard_input, identify, parse_model, push_setup, IDENTIFY_COMMAND,
};
pub use session::{DeviceSession, SessionConfig};
