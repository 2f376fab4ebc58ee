//! In-memory engraver used by the stream and session tests

#![allow(dead_code)]

use laserkit_communication::SerialPort;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// When the fake device answers written lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Every line is answered as soon as it is written
    Echo,
    /// Answers are held until the test releases them
    Manual,
}

#[derive(Debug)]
struct DeviceState {
    identity: String,
    mode: AckMode,
    lines: Vec<String>,
    partial: String,
    outbox: VecDeque<u8>,
    held: usize,
    replies_read: usize,
    max_outstanding: usize,
    fail_writes: bool,
    closed: bool,
    timeouts: Vec<Duration>,
    answer_twice: Option<String>,
}

/// Test handle onto the fake device
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    /// A device answering `$I` with `identity` (e.g. "[MODEL:LaserX]\n")
    pub fn new(identity: &str, mode: AckMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                identity: identity.to_string(),
                mode,
                lines: Vec::new(),
                partial: String::new(),
                outbox: VecDeque::new(),
                held: 0,
                replies_read: 0,
                max_outstanding: 0,
                fail_writes: false,
                closed: false,
                timeouts: Vec::new(),
                answer_twice: None,
            })),
        }
    }

    /// A transport wired to this device
    pub fn port(&self, name: &str) -> Box<dyn SerialPort> {
        Box::new(MockPort {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            max_read: usize::MAX,
        })
    }

    /// Like [`MockDevice::port`], but every read returns at most one byte
    pub fn trickle_port(&self, name: &str) -> Box<dyn SerialPort> {
        Box::new(MockPort {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            max_read: 1,
        })
    }

    /// Every complete line written so far
    pub fn lines(&self) -> Vec<String> {
        self.state.lock().unwrap().lines.clone()
    }

    /// Lines written that are not handshake traffic
    pub fn stream_lines(&self, skip: usize) -> Vec<String> {
        self.lines().into_iter().skip(skip).collect()
    }

    /// Largest number of written-but-unanswered lines ever observed
    pub fn max_outstanding(&self) -> usize {
        self.state.lock().unwrap().max_outstanding
    }

    /// Answer up to `count` held lines
    pub fn release(&self, count: usize) -> usize {
        let mut state = self.state.lock().unwrap();
        let count = count.min(state.held);
        state.held -= count;
        for _ in 0..count {
            state.outbox.extend(b"ok\n");
        }
        count
    }

    /// Queue raw bytes to be read by the host
    pub fn push_raw(&self, bytes: &[u8]) {
        self.state.lock().unwrap().outbox.extend(bytes);
    }

    pub fn set_identity(&self, identity: &str) {
        self.state.lock().unwrap().identity = identity.to_string();
    }

    /// Answer `line` with two reply lines instead of one
    pub fn answer_twice(&self, line: &str) {
        self.state.lock().unwrap().answer_twice = Some(line.to_string());
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Read timeouts the host has applied, in order
    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.lock().unwrap().timeouts.clone()
    }
}

struct MockPort {
    name: String,
    state: Arc<Mutex<DeviceState>>,
    max_read: usize,
}

impl SerialPort for MockPort {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable unplugged"));
        }
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        }

        state.partial.push_str(&String::from_utf8_lossy(data));
        while let Some(pos) = state.partial.find('\n') {
            let line: String = state.partial.drain(..=pos).collect();
            let line = line.trim().to_string();

            if line == "$I" {
                let identity = state.identity.clone();
                state.outbox.extend(identity.as_bytes());
            } else if state.answer_twice.as_deref() == Some(line.as_str()) {
                state.outbox.extend(b"ok\nok\n");
            } else {
                match state.mode {
                    AckMode::Echo => state.outbox.extend(b"ok\n"),
                    AckMode::Manual => state.held += 1,
                }
            }
            state.lines.push(line);

            let outstanding = state.lines.len() - state.replies_read;
            state.max_outstanding = state.max_outstanding.max(outstanding);
        }
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let n = buf.len().min(state.outbox.len()).min(self.max_read);
        for slot in buf.iter_mut().take(n) {
            *slot = state.outbox.pop_front().unwrap_or(b'\n');
        }
        state.replies_read += buf[..n].iter().filter(|b| **b == b'\n').count();
        Ok(n)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.state.lock().unwrap().timeouts.push(timeout);
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
