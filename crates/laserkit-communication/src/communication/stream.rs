//! Flow-controlled streaming of command lines to a device
//!
//! Producers append lines to an [`OutboundQueue`]; a dedicated worker thread
//! drains it onto the transport while keeping at most `window_limit` lines
//! unacknowledged. Each reply line from the device counts as one
//! acknowledgement.
//!
//! The bookkeeping lock covers the queue and the [`FlowWindow`] only. The
//! transport sits behind its own lock, so producers never wait on serial I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use laserkit_core::{ControllerError, PendingQueue, ThreadSafe};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

use super::serial::{is_timeout, SerialPort};

/// Lines in flight before the worker stops writing
pub const DEFAULT_WINDOW_LIMIT: usize = 200;
/// Worker sleep when an iteration made no progress
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(5);
/// Bytes requested per transport read
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Raw command lines awaiting transmission
pub type OutboundQueue = PendingQueue<String>;

/// Stream worker tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Maximum unacknowledged lines (device receive buffer capacity)
    pub window_limit: usize,
    /// Sleep between iterations that neither wrote nor read anything
    pub idle_backoff: Duration,
    /// Read buffer size
    pub read_chunk: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_limit: DEFAULT_WINDOW_LIMIT,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

/// Sent/acknowledged line counters for one session
///
/// `sent - received` never exceeds `limit`, and `received` never exceeds
/// `sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowWindow {
    sent: usize,
    received: usize,
    limit: usize,
}

impl FlowWindow {
    /// Empty window; a zero limit is raised to 1 so the stream can progress
    pub fn new(limit: usize) -> Self {
        Self {
            sent: 0,
            received: 0,
            limit: limit.max(1),
        }
    }

    /// Lines written to the transport
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Acknowledgements read back
    pub fn received(&self) -> usize {
        self.received
    }

    /// Window capacity
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Lines written but not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.sent - self.received
    }

    /// How many more lines may be written right now
    pub fn allowance(&self) -> usize {
        self.limit - self.in_flight()
    }

    /// Record `count` lines as written, never beyond the allowance
    ///
    /// Returns the number actually recorded.
    pub fn record_sent(&mut self, count: usize) -> usize {
        let count = count.min(self.allowance());
        self.sent += count;
        count
    }

    /// Record reply lines; surplus replies beyond `sent` are ignored
    ///
    /// Returns the number of acknowledgements that counted.
    pub fn record_received(&mut self, count: usize) -> usize {
        let count = count.min(self.in_flight());
        self.received += count;
        count
    }

    /// Back to zero, as on reconnect
    pub fn reset(&mut self) {
        self.sent = 0;
        self.received = 0;
    }
}

/// Snapshot of a stream for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub queued: usize,
    pub sent: usize,
    pub received: usize,
    pub in_flight: usize,
    pub limit: usize,
    pub connected: bool,
}

impl StreamStatus {
    /// Nothing queued and nothing awaiting acknowledgement
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.in_flight == 0
    }
}

struct StreamState {
    queue: OutboundQueue,
    window: FlowWindow,
    shutdown: bool,
}

struct Shared {
    state: Mutex<StreamState>,
    wake: Condvar,
    connected: AtomicBool,
}

impl Shared {
    fn status(&self) -> StreamStatus {
        let state = self.state.lock();
        StreamStatus {
            queued: state.queue.len(),
            sent: state.window.sent(),
            received: state.window.received(),
            in_flight: state.window.in_flight(),
            limit: state.window.limit(),
            connected: self.connected.load(Ordering::Acquire),
        }
    }

    /// Transport failure: stop accepting work and wake every waiter
    fn fault(&self, port: &str, reason: &str) {
        if self.connected.swap(false, Ordering::AcqRel) {
            error!("Transport failure on {}: {}", port, reason);
        }
        self.state.lock().shutdown = true;
        self.wake.notify_all();
    }
}

/// Owns the outbound queue, the flow window and the worker draining them
pub struct StreamController {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    port_name: String,
}

impl StreamController {
    /// Start streaming to `transport`
    ///
    /// The transport should already use a short read timeout; the worker
    /// polls it for acknowledgements.
    pub fn start(
        transport: ThreadSafe<Box<dyn SerialPort>>,
        config: StreamConfig,
    ) -> Result<Self, ControllerError> {
        let port_name = transport.lock().name();
        let shared = Arc::new(Shared {
            state: Mutex::new(StreamState {
                queue: OutboundQueue::new(),
                window: FlowWindow::new(config.window_limit),
                shutdown: false,
            }),
            wake: Condvar::new(),
            connected: AtomicBool::new(true),
        });

        let worker_shared = Arc::clone(&shared);
        let worker_port = port_name.clone();
        let handle = thread::Builder::new()
            .name(format!("laserkit-stream-{}", thread_suffix(&port_name)))
            .spawn(move || run_worker(worker_shared, transport, config, worker_port))
            .map_err(|e| ControllerError::WorkerUnavailable {
                reason: format!("Failed to spawn stream worker: {}", e),
            })?;

        debug!("Stream worker started for {}", port_name);
        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
            port_name,
        })
    }

    /// Name of the transport this controller writes to
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Queue every non-blank, non-comment line of `text`
    ///
    /// Returns the number of lines queued.
    pub fn enqueue(&self, text: &str) -> Result<usize, ControllerError> {
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(';'))
            .map(str::to_string)
            .collect();

        let count = lines.len();
        {
            let mut state = self.shared.state.lock();
            if state.shutdown || !self.is_connected() {
                return Err(ControllerError::NotConnected);
            }
            state.queue.extend(lines);
        }
        self.shared.wake.notify_all();

        trace!("Queued {} lines for {}", count, self.port_name);
        Ok(count)
    }

    /// Discard every line not yet written, returning how many were dropped
    pub fn clear(&self) -> usize {
        let dropped = self.shared.state.lock().queue.clear();
        self.shared.wake.notify_all();
        if dropped > 0 {
            info!("Cleared {} queued lines for {}", dropped, self.port_name);
        }
        dropped
    }

    /// Snapshot of queue and window
    pub fn status(&self) -> StreamStatus {
        self.shared.status()
    }

    /// Whether the transport is still healthy and the worker running
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Nothing queued and no acknowledgement outstanding
    pub fn is_idle(&self) -> bool {
        self.status().is_idle()
    }

    /// Block until idle, the stream faults, or `timeout` elapses
    ///
    /// Returns whether the stream is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            let idle = state.queue.is_empty() && state.window.in_flight() == 0;
            if idle || state.shutdown {
                return idle;
            }
            if self.shared.wake.wait_until(&mut state, deadline).timed_out() {
                return state.queue.is_empty() && state.window.in_flight() == 0;
            }
        }
    }

    /// Stop the worker and wait for it to exit
    ///
    /// Queued lines are dropped. Safe to call more than once.
    pub fn shutdown(&self) {
        self.shared.connected.store(false, Ordering::Release);
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_all();

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("Stream worker for {} panicked", self.port_name);
            } else {
                debug!("Stream worker for {} stopped", self.port_name);
            }
        }
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StreamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("port_name", &self.port_name)
            .field("status", &self.status())
            .finish()
    }
}

/// Short, thread-name-safe form of a port name ("/dev/ttyUSB0" -> "ttyUSB0")
fn thread_suffix(port_name: &str) -> &str {
    port_name.rsplit('/').next().unwrap_or(port_name)
}

/// Count complete lines in `pending`, keeping any trailing partial line
///
/// Content does not matter: an empty line is an acknowledgement too.
fn take_reply_lines(pending: &mut String) -> usize {
    let Some(last_newline) = pending.rfind('\n') else {
        return 0;
    };
    let count = pending[..=last_newline].matches('\n').count();
    pending.drain(..=last_newline);
    count
}

fn run_worker(
    shared: Arc<Shared>,
    transport: ThreadSafe<Box<dyn SerialPort>>,
    config: StreamConfig,
    port_name: String,
) {
    let mut pending = String::new();
    let mut buf = vec![0u8; config.read_chunk.max(1)];
    let mut out = String::new();

    loop {
        // Wait for work, then claim a batch that fits the window.
        let batch = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if !state.queue.is_empty() || state.window.in_flight() > 0 {
                    break;
                }
                shared.wake.wait_for(&mut state, config.idle_backoff);
            }
            let allowance = state.window.allowance();
            let batch = state.queue.take_front(allowance);
            state.window.record_sent(batch.len());
            batch
        };

        let mut progressed = false;

        if !batch.is_empty() {
            out.clear();
            for line in &batch {
                out.push_str(line);
                out.push('\n');
            }
            if let Err(e) = transport.lock().write_all(out.as_bytes()) {
                shared.fault(&port_name, &e.to_string());
                return;
            }
            debug!("Wrote {} lines to {}", batch.len(), port_name);
            progressed = true;
        }

        let read = transport.lock().read(&mut buf);
        match read {
            Ok(0) => {}
            Ok(n) => {
                pending.push_str(&String::from_utf8_lossy(&buf[..n]));
                let replies = take_reply_lines(&mut pending);
                if replies > 0 {
                    let counted = shared.state.lock().window.record_received(replies);
                    if counted < replies {
                        trace!("Ignored {} surplus replies on {}", replies - counted, port_name);
                    }
                    shared.wake.notify_all();
                }
                progressed = true;
            }
            Err(e) if is_timeout(&e) => {}
            Err(e) => {
                shared.fault(&port_name, &e.to_string());
                return;
            }
        }

        if !progressed {
            thread::sleep(config.idle_backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_window_limits() {
        let mut window = FlowWindow::new(3);
        assert_eq!(window.record_sent(5), 3);
        assert_eq!(window.allowance(), 0);
        assert_eq!(window.record_received(1), 1);
        assert_eq!(window.allowance(), 1);
        // Surplus replies are ignored.
        assert_eq!(window.record_received(10), 2);
        assert_eq!(window.received(), window.sent());
        window.reset();
        assert_eq!(window.sent(), 0);
        assert_eq!(FlowWindow::new(0).limit(), 1);
    }

    #[test]
    fn test_reply_lines_keep_partial_tail() {
        let mut pending = String::from("ok\r\nok\n\nok");
        assert_eq!(take_reply_lines(&mut pending), 3);
        assert_eq!(pending, "ok");
        pending.push('\n');
        assert_eq!(take_reply_lines(&mut pending), 1);
        assert!(pending.is_empty());
        assert_eq!(take_reply_lines(&mut pending), 0);

        let mut pending = String::from("\r\n\n");
        assert_eq!(take_reply_lines(&mut pending), 2);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_thread_suffix() {
        assert_eq!(thread_suffix("/dev/ttyUSB0"), "ttyUSB0");
        assert_eq!(thread_suffix("COM3"), "COM3");
    }
}
