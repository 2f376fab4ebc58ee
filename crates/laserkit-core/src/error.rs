//! Error handling for LaserKit
//!
//! Provides error types for every layer of the engine:
//! - G-Code errors (decoding)
//! - Motion errors (profile planning)
//! - Connection errors (serial transport)
//! - Controller errors (session lifecycle)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Controller error type
///
/// Represents errors related to the lifecycle of a device session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// Session was closed or faulted; a new handshake is required
    #[error("Controller not connected")]
    NotConnected,

    /// The background stream worker could not be started
    #[error("Stream worker unavailable: {reason}")]
    WorkerUnavailable {
        /// The reason the worker is unavailable.
        reason: String,
    },
}

/// G-Code error type
///
/// Represents problems found while decoding a single line of G-Code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// Invalid parameter value
    #[error("Invalid parameter '{param}' in '{line}': {reason}")]
    InvalidParameter {
        /// The offending line.
        line: String,
        /// The parameter word (e.g. `X1.2.3`).
        param: String,
        /// The reason the parameter is invalid.
        reason: String,
    },
}

/// Motion planning error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// A planning parameter was zero, negative or not finite
    #[error("Invalid motion parameter {name}={value}: must be finite and > 0")]
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A start or end coordinate was not finite
    #[error("Non-finite coordinate in move from {from} to {to}")]
    NonFiniteCoordinate {
        /// Start point.
        from: String,
        /// End point.
        to: String,
    },
}

/// Connection error type
///
/// Represents errors related to the serial transport.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Failed to open port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Connection lost
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Serial port error
    #[error("Serial port error: {reason}")]
    SerialError {
        /// The reason for the serial port error.
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {reason}")]
    IoError {
        /// The reason for the I/O error.
        reason: String,
    },

    /// Invalid connection parameters
    #[error("Invalid connection parameters: {reason}")]
    InvalidParameters {
        /// The reason the parameters are invalid.
        reason: String,
    },
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::IoError {
            reason: err.to_string(),
        }
    }
}

/// Main error type for LaserKit
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Controller error
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Motion planning error
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a controller error
    pub fn is_controller_error(&self) -> bool {
        matches!(self, Error::Controller(_))
    }

    /// Check if the session behind this error must be reconnected
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Error::Controller(ControllerError::NotConnected)
                | Error::Connection(ConnectionError::ConnectionLost { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_to_connection_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ConnectionError = io.into();
        assert!(matches!(err, ConnectionError::IoError { .. }));
    }

    #[test]
    fn test_reconnect_classification() {
        let err: Error = ControllerError::NotConnected.into();
        assert!(err.requires_reconnect());
        assert!(err.is_controller_error());

        let err: Error = MotionError::InvalidParameter {
            name: "tick",
            value: 0.0,
        }
        .into();
        assert!(!err.requires_reconnect());
    }
}
