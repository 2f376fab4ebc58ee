//! # LaserKit Communication
//!
//! Serial transport and device protocol for LaserKit.
//! Streams command lines to a USB-attached engraver under a bounded
//! in-flight window, and discovers, identifies and configures devices.

pub mod communication;
pub mod firmware;

pub use communication::{
    serial::{is_candidate_port, list_all_ports, list_ports, SerialPortInfo},
    ConnectionParams, FlowWindow, OutboundQueue, RealSerialPort, SerialParity, SerialPort,
    StreamConfig, StreamController, StreamStatus, DEFAULT_BAUD_RATE,
};

pub use firmware::{
    default_setup_commands, discard_input, identify, parse_model, push_setup, DeviceSession,
    SessionConfig, IDENTIFY_COMMAND,
};
