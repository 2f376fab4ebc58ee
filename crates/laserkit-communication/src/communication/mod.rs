//! Serial transport and flow-controlled streaming
//!
//! This module provides:
//! - Serial connection parameters
//! - Port enumeration and the transport trait
//! - The stream controller that drains queued lines to a device

pub mod serial;
pub mod stream;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use serial::{list_all_ports, list_ports, RealSerialPort, SerialPort, SerialPortInfo};
pub use stream::{FlowWindow, OutboundQueue, StreamConfig, StreamController, StreamStatus};

/// Baud rate spoken by the engraver firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialParity {
    #[default]
    None,
    Even,
    Odd,
}

/// Parameters for opening a serial connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    pub data_bits: u8,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Hardware flow control
    pub flow_control: bool,
    /// Read timeout applied when the port is opened
    pub timeout_ms: u64,
}

impl ConnectionParams {
    /// 8N1 parameters for `port` at the default baud rate
    pub fn serial(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    /// Override the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Read timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: false,
            timeout_ms: 1000,
        }
    }
}
