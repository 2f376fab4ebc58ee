//! Identification handshake and device setup
//!
//! The engraver answers `$I` with a line carrying `[MODEL:<name>]`. After
//! identification a fixed list of vendor setup lines is pushed, each answered
//! by one reply line.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use laserkit_core::ConnectionError;
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::communication::serial::{is_timeout, SerialPort};

/// Identification query
pub const IDENTIFY_COMMAND: &str = "$I";

/// Step pulse width
pub const STEP_PULSE_COMMAND: &str = "$222P1P400";
/// Axis inversion
pub const AXIS_INVERSION_COMMAND: &str = "$240P3P6P5P1";
/// Process parameters
pub const PROCESS_PARAMS_COMMAND: &str = "T0 C25";

/// Setup lines pushed after a successful identification
pub fn default_setup_commands() -> Vec<String> {
    [STEP_PULSE_COMMAND, AXIS_INVERSION_COMMAND, PROCESS_PARAMS_COMMAND]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Extract the model name from an identification reply
///
/// The name is the text between `[MODEL:` and the next `]`.
pub fn parse_model(reply: &str) -> Option<String> {
    static MODEL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = MODEL_REGEX
        .get_or_init(|| Regex::new(r"\[MODEL:([^\]]*)\]").expect("invalid regex pattern"));
    regex
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Query the device model
///
/// Reads until the marker is complete, the line goes quiet, or `timeout`
/// elapses. Anything sent after the marker (such as a trailing `ok`) is read
/// and dropped. `Ok(None)` means something answered but it is not our device.
pub fn identify(
    port: &mut dyn SerialPort,
    timeout: Duration,
) -> Result<Option<String>, ConnectionError> {
    port.write_all(format!("{}\n", IDENTIFY_COMMAND).as_bytes())?;

    let deadline = Instant::now() + timeout;
    let mut reply = String::new();
    let mut buf = [0u8; 256];

    loop {
        if let Some(model) = parse_model(&reply) {
            discard_input(port, timeout)?;
            debug!("{} identified as {}", port.name(), model);
            return Ok(Some(model));
        }
        if Instant::now() >= deadline {
            break;
        }
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => reply.push_str(&String::from_utf8_lossy(&buf[..n])),
            Err(e) if is_timeout(&e) => break,
            Err(e) => return Err(e.into()),
        }
    }

    debug!(
        "{} gave no model marker (reply: {:?})",
        port.name(),
        reply.trim()
    );
    Ok(None)
}

/// Read and drop whatever the device has already sent
///
/// Stops once a read comes back empty or times out, or after `timeout`.
/// Returns the number of bytes dropped.
pub fn discard_input(
    port: &mut dyn SerialPort,
    timeout: Duration,
) -> Result<usize, ConnectionError> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 256];
    let mut dropped = 0;

    while Instant::now() < deadline {
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => dropped += n,
            Err(e) if is_timeout(&e) => break,
            Err(e) => return Err(e.into()),
        }
    }
    if dropped > 0 {
        trace!("Dropped {} stale bytes from {}", dropped, port.name());
    }
    Ok(dropped)
}

/// Push setup lines, reading one reply line after each
///
/// A missing reply is logged and skipped; only transport errors fail.
pub fn push_setup(
    port: &mut dyn SerialPort,
    commands: &[String],
    timeout: Duration,
) -> Result<(), ConnectionError> {
    for command in commands {
        port.write_all(format!("{}\n", command).as_bytes())?;
        match read_line(port, timeout)? {
            Some(reply) => debug!("{} -> {}", command, reply),
            None => warn!("No reply to setup command {} on {}", command, port.name()),
        }
    }
    Ok(())
}

/// Read one reply line, or `None` if the device stays quiet
fn read_line(port: &mut dyn SerialPort, timeout: Duration) -> Result<Option<String>, ConnectionError> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while Instant::now() < deadline {
        match port.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => {
                return Ok(Some(String::from_utf8_lossy(&line).trim().to_string()));
            }
            Ok(_) => line.push(byte[0]),
            Err(e) if is_timeout(&e) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}
