//! Device sessions
//!
//! A session is one identified engraver on one transport: the handshake has
//! succeeded, setup lines have been pushed, and a stream worker is running.
//! Sessions are independent; each owns its own lock, queue and worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use laserkit_core::{thread_safe, ConnectionError, ControllerError, ThreadSafe};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::handshake::{default_setup_commands, discard_input, identify, push_setup};
use crate::communication::{
    list_ports, ConnectionParams, RealSerialPort, SerialPort, StreamConfig, StreamController,
    StreamStatus, DEFAULT_BAUD_RATE,
};

/// How a session is opened and configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub baud_rate: u32,
    /// Timeout for the handshake and each setup reply
    pub handshake_timeout: Duration,
    /// Read timeout while streaming
    pub poll_timeout: Duration,
    /// Lines pushed after identification
    pub setup_commands: Vec<String>,
    pub stream: StreamConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            handshake_timeout: Duration::from_secs(1),
            poll_timeout: Duration::from_millis(10),
            setup_commands: default_setup_commands(),
            stream: StreamConfig::default(),
        }
    }
}

/// A connected, identified engraver
pub struct DeviceSession {
    id: Uuid,
    port_name: String,
    model: RwLock<String>,
    transport: ThreadSafe<Box<dyn SerialPort>>,
    stream: StreamController,
    config: SessionConfig,
    closed: AtomicBool,
}

impl DeviceSession {
    /// Open `port` and run the handshake
    ///
    /// Returns `Ok(None)` when the port answers without a model marker.
    pub fn connect(port: &str, config: &SessionConfig) -> Result<Option<Self>, ConnectionError> {
        let params = ConnectionParams::serial(port)
            .with_baud_rate(config.baud_rate)
            .with_timeout(config.handshake_timeout);
        let transport = RealSerialPort::open(&params)?;
        Self::open_with(Box::new(transport), config)
    }

    /// Run the handshake over an already open transport
    pub fn open_with(
        mut transport: Box<dyn SerialPort>,
        config: &SessionConfig,
    ) -> Result<Option<Self>, ConnectionError> {
        let port_name = transport.name();
        transport.set_timeout(config.handshake_timeout)?;

        let Some(model) = identify(transport.as_mut(), config.handshake_timeout)? else {
            info!("No engraver answered on {}", port_name);
            if let Err(e) = transport.close() {
                warn!("Failed to close {}: {}", port_name, e);
            }
            return Ok(None);
        };

        push_setup(
            transport.as_mut(),
            &config.setup_commands,
            config.handshake_timeout,
        )?;
        transport.set_timeout(config.poll_timeout)?;
        // Late setup replies must not count as stream acknowledgements.
        discard_input(transport.as_mut(), config.handshake_timeout)?;

        let transport: ThreadSafe<Box<dyn SerialPort>> = thread_safe(transport);
        let stream = StreamController::start(Arc::clone(&transport), config.stream.clone())
            .map_err(|e| ConnectionError::IoError {
                reason: e.to_string(),
            })?;

        let id = Uuid::new_v4();
        info!("Session {} connected to {} on {}", id, model, port_name);

        Ok(Some(Self {
            id,
            port_name,
            model: RwLock::new(model),
            transport,
            stream,
            config: config.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    /// Try every candidate serial port, keeping the ones that identify
    pub fn discover(config: &SessionConfig) -> Result<Vec<Self>, ConnectionError> {
        let mut sessions = Vec::new();
        for port in list_ports()? {
            match Self::connect(&port.port_name, config) {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => warn!("Skipping {}: {}", port.port_name, e),
            }
        }
        info!("Discovered {} engraver(s)", sessions.len());
        Ok(sessions)
    }

    /// Unique id for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Model name reported by the last handshake
    pub fn model(&self) -> String {
        self.model.read().clone()
    }

    /// Cached connection flag
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.stream.is_connected()
    }

    /// Re-run the handshake if the stream is idle
    ///
    /// While lines are in flight the cached flag is returned unchanged. A
    /// device that stops identifying itself leaves the session disconnected.
    pub fn verify(&self) -> bool {
        if !self.is_connected() {
            return false;
        }
        if !self.stream.is_idle() {
            return true;
        }

        let result = {
            let mut transport = self.transport.lock();
            let timeout = self.config.handshake_timeout;
            let result = transport
                .set_timeout(timeout)
                .map_err(ConnectionError::from)
                .and_then(|_| discard_input(transport.as_mut(), timeout))
                .and_then(|_| identify(transport.as_mut(), timeout));
            if let Err(e) = transport.set_timeout(self.config.poll_timeout) {
                warn!("Failed to restore poll timeout on {}: {}", self.port_name, e);
            }
            result
        };

        match result {
            Ok(Some(model)) => {
                *self.model.write() = model;
                true
            }
            Ok(None) => {
                warn!("Session {} no longer identifies; disconnecting", self.id);
                self.stream.shutdown();
                false
            }
            Err(e) => {
                warn!("Session {} failed verification: {}", self.id, e);
                self.stream.shutdown();
                false
            }
        }
    }

    /// Queue program text for the device
    pub fn enqueue(&self, text: &str) -> Result<usize, ControllerError> {
        self.ensure_open()?;
        self.stream.enqueue(text)
    }

    /// Drop every line not yet written
    pub fn clear(&self) -> Result<usize, ControllerError> {
        self.ensure_open()?;
        Ok(self.stream.clear())
    }

    /// Queue and window snapshot
    pub fn status(&self) -> Result<StreamStatus, ControllerError> {
        self.ensure_open()?;
        Ok(self.stream.status())
    }

    /// Nothing queued and nothing awaiting acknowledgement
    pub fn is_idle(&self) -> Result<bool, ControllerError> {
        self.ensure_open()?;
        Ok(self.stream.is_idle())
    }

    /// Block until idle, faulted, or timed out
    pub fn wait_idle(&self, timeout: Duration) -> Result<bool, ControllerError> {
        self.ensure_open()?;
        Ok(self.stream.wait_idle(timeout))
    }

    /// Stop streaming and close the transport
    pub fn disconnect(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stream.shutdown();
        if let Err(e) = self.transport.lock().close() {
            warn!("Failed to close {}: {}", self.port_name, e);
        }
        info!("Session {} disconnected from {}", self.id, self.port_name);
    }

    fn ensure_open(&self) -> Result<(), ControllerError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ControllerError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("id", &self.id)
            .field("port_name", &self.port_name)
            .field("model", &*self.model.read())
            .field("connected", &self.is_connected())
            .finish()
    }
}
