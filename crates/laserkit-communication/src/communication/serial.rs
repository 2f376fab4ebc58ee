//! Serial port communication implementation
//!
//! Provides low-level serial port operations for direct hardware connection
//! to laser controllers via USB.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Baud rate, parity and stop bit configuration
//! - Blocking reads with an adjustable timeout

use super::{ConnectionParams, SerialParity};
use laserkit_core::ConnectionError;
use std::io;
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List every serial port the OS reports
pub fn list_all_ports() -> Result<Vec<SerialPortInfo>, ConnectionError> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        ConnectionError::SerialError {
            reason: format!("Failed to enumerate ports: {}", e),
        }
    })?;

    Ok(ports
        .iter()
        .map(|port| {
            let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

            match &port.port_type {
                serialport::SerialPortType::UsbPort(usb_info) => {
                    let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                    if let Some(ref mfg) = usb_info.manufacturer {
                        info = info.with_manufacturer(mfg);
                    }
                    if let Some(ref serial) = usb_info.serial_number {
                        info = info.with_serial_number(serial);
                    }
                    info
                }
                _ => info,
            }
        })
        .collect())
}

/// List serial ports that could host an engraver
///
/// Filters to USB serial patterns:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>, ConnectionError> {
    Ok(candidate_ports(list_all_ports()?))
}

fn candidate_ports(ports: Vec<SerialPortInfo>) -> Vec<SerialPortInfo> {
    ports
        .into_iter()
        .filter(|port| is_candidate_port(&port.port_name))
        .collect()
}

/// Check if a port name matches a USB serial pattern
pub fn is_candidate_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

/// Get a user-friendly description for a port
fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Convert a parity setting to serialport format
fn to_serialport_parity(parity: SerialParity) -> serialport::Parity {
    match parity {
        SerialParity::None => serialport::Parity::None,
        SerialParity::Even => serialport::Parity::Even,
        SerialParity::Odd => serialport::Parity::Odd,
    }
}

/// Whether an I/O error only means "no data yet"
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Byte-stream transport to a device
///
/// Reads block for at most the configured timeout and may return `Ok(0)` or a
/// timeout error when nothing arrived.
pub trait SerialPort: Send {
    /// Write data to the port
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read data from the port
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Change the read timeout
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Get the port name
    fn name(&self) -> String;

    /// Close the port
    fn close(&mut self) -> io::Result<()>;

    /// Write the whole buffer
    fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.write(data) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "transport accepted no bytes",
                    ))
                }
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Real serial port implementation using serialport crate
pub struct RealSerialPort {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl RealSerialPort {
    /// Open a serial port with the given parameters
    pub fn open(params: &ConnectionParams) -> Result<Self, ConnectionError> {
        let invalid = |reason: String| ConnectionError::InvalidParameters { reason };

        let builder = serialport::new(&params.port, params.baud_rate)
            .timeout(params.timeout())
            .data_bits(match params.data_bits {
                5 => serialport::DataBits::Five,
                6 => serialport::DataBits::Six,
                7 => serialport::DataBits::Seven,
                8 => serialport::DataBits::Eight,
                _ => return Err(invalid(format!("Invalid data bits: {}", params.data_bits))),
            })
            .stop_bits(match params.stop_bits {
                1 => serialport::StopBits::One,
                2 => serialport::StopBits::Two,
                _ => return Err(invalid(format!("Invalid stop bits: {}", params.stop_bits))),
            })
            .parity(to_serialport_parity(params.parity))
            .flow_control(if params.flow_control {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            });

        match builder.open() {
            Ok(port) => {
                tracing::debug!("Opened {} at {} baud", params.port, params.baud_rate);
                Ok(RealSerialPort {
                    name: params.port.clone(),
                    port: Some(port),
                })
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                Err(ConnectionError::FailedToOpen {
                    port: params.port.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port is closed"))
    }
}

impl SerialPort for RealSerialPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        io::Write::write(self.port()?, data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self.port()?, buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(self.port()?.as_mut(), timeout).map_err(io::Error::from)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut port) = self.port.take() {
            io::Write::flush(&mut port)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RealSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealSerialPort")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_port_patterns() {
        assert!(is_candidate_port("COM3"));
        assert!(is_candidate_port("/dev/ttyUSB0"));
        assert!(is_candidate_port("/dev/ttyACM1"));
        assert!(is_candidate_port("/dev/cu.usbmodem1421"));
        assert!(!is_candidate_port("COM"));
        assert!(!is_candidate_port("COMX"));
        assert!(!is_candidate_port("/dev/ttyS0"));
        assert!(!is_candidate_port("/dev/cu.Bluetooth-Incoming-Port"));
    }

    #[test]
    fn test_port_info_builder() {
        let info = SerialPortInfo::new("/dev/ttyUSB0", "USB Serial")
            .with_usb_ids(0x1a86, 0x7523)
            .with_manufacturer("QinHeng")
            .with_serial_number("A1");
        assert_eq!(info.vid, Some(0x1a86));
        assert_eq!(info.pid, Some(0x7523));
        assert_eq!(info.manufacturer.as_deref(), Some("QinHeng"));
        assert_eq!(info.serial_number.as_deref(), Some("A1"));
    }

    #[test]
    fn test_candidate_ports_keeps_usb_serial_only() {
        let ports = vec![
            SerialPortInfo::new("/dev/ttyS0", "Serial Port"),
            SerialPortInfo::new("/dev/ttyUSB0", "USB QinHeng Serial Port"),
            SerialPortInfo::new("/dev/cu.Bluetooth-Incoming-Port", "Bluetooth Serial"),
            SerialPortInfo::new("COM4", "Serial Port"),
        ];
        let names: Vec<String> = candidate_ports(ports)
            .into_iter()
            .map(|port| port.port_name)
            .collect();
        assert_eq!(names, vec!["/dev/ttyUSB0", "COM4"]);
    }
}
