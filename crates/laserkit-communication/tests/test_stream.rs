mod common;

use common::{wait_for, AckMode, MockDevice};
use laserkit_communication::{StreamConfig, StreamController};
use laserkit_core::{thread_safe, ControllerError};
use proptest::prelude::*;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn start(device: &MockDevice, window_limit: usize) -> StreamController {
    let config = StreamConfig {
        window_limit,
        idle_backoff: Duration::from_millis(1),
        ..Default::default()
    };
    StreamController::start(thread_safe(device.port("mock0")), config).unwrap()
}

#[test]
fn test_three_line_program_drains_with_echo() {
    let device = MockDevice::new("", AckMode::Echo);
    let stream = start(&device, 100);

    assert_eq!(stream.enqueue("G0\nG1 X10 Y0 F100\nM5\n").unwrap(), 3);
    assert!(stream.wait_idle(WAIT));

    let status = stream.status();
    assert_eq!(status.sent, 3);
    assert_eq!(status.received, 3);
    assert_eq!(status.queued, 0);
    assert!(status.connected);
    assert_eq!(device.lines(), vec!["G0", "G1 X10 Y0 F100", "M5"]);
    assert!(device.max_outstanding() <= 100);
}

#[test]
fn test_blank_and_comment_lines_are_not_queued() {
    let device = MockDevice::new("", AckMode::Echo);
    let stream = start(&device, 10);

    assert_eq!(stream.enqueue("; header\n\n   G0  \r\n;M3\nM5").unwrap(), 2);
    assert!(stream.wait_idle(WAIT));
    assert_eq!(device.lines(), vec!["G0", "M5"]);
}

#[test]
fn test_window_limits_lines_in_flight() {
    let device = MockDevice::new("", AckMode::Manual);
    let stream = start(&device, 4);

    let program: String = (0..20).map(|i| format!("G1 X{}\n", i)).collect();
    stream.enqueue(&program).unwrap();

    assert!(wait_for(WAIT, || device.lines().len() == 4));
    // Nothing more goes out until the device answers.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(device.lines().len(), 4);
    let status = stream.status();
    assert_eq!(status.in_flight, 4);
    assert_eq!(status.queued, 16);

    assert!(wait_for(WAIT, || {
        device.release(1);
        stream.is_idle()
    }));

    let status = stream.status();
    assert_eq!(status.sent, 20);
    assert_eq!(status.received, 20);
    assert!(device.max_outstanding() <= 4);
}

#[test]
fn test_clear_mid_drain_keeps_written_lines() {
    let device = MockDevice::new("", AckMode::Manual);
    let stream = start(&device, 2);

    let program: String = (0..10).map(|i| format!("G1 Y{}\n", i)).collect();
    stream.enqueue(&program).unwrap();
    assert!(wait_for(WAIT, || device.lines().len() == 2));

    assert_eq!(stream.clear(), 8);
    assert!(!stream.is_idle());

    // Acknowledgements for lines already written still count.
    device.release(2);
    assert!(stream.wait_idle(WAIT));

    let status = stream.status();
    assert_eq!(status.sent, 2);
    assert_eq!(status.received, 2);
    assert_eq!(device.lines(), vec!["G1 Y0", "G1 Y1"]);
}

#[test]
fn test_partial_and_surplus_replies() {
    let device = MockDevice::new("", AckMode::Manual);
    let stream = start(&device, 10);

    stream.enqueue("G0\nM5\nG1 X1").unwrap();
    assert!(wait_for(WAIT, || device.lines().len() == 3));

    device.push_raw(b"ok\no");
    assert!(wait_for(WAIT, || stream.status().received == 1));
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(stream.status().received, 1);

    // The rest of the second reply, an empty third reply, then a surplus line.
    device.push_raw(b"k\n\r\nok\n");
    assert!(stream.wait_idle(WAIT));
    let status = stream.status();
    assert_eq!(status.received, 3);
    assert_eq!(status.sent, 3);
}

#[test]
fn test_empty_reply_line_is_an_acknowledgement() {
    let device = MockDevice::new("", AckMode::Manual);
    let stream = start(&device, 1);

    stream.enqueue("G0\nG1 X5").unwrap();
    assert!(wait_for(WAIT, || device.lines().len() == 1));

    device.push_raw(b"\r\n");
    assert!(wait_for(WAIT, || device.lines().len() == 2));
    device.push_raw(b"\n");
    assert!(stream.wait_idle(WAIT));
    assert_eq!(stream.status().received, 2);
}

#[test]
fn test_write_failure_marks_disconnected() {
    let device = MockDevice::new("", AckMode::Echo);
    let stream = start(&device, 10);
    device.fail_writes();

    stream.enqueue("G1 X1").unwrap();
    assert!(wait_for(WAIT, || !stream.is_connected()));
    assert!(!stream.status().connected);
    assert_eq!(
        stream.enqueue("G1 X2"),
        Err(ControllerError::NotConnected)
    );
}

#[test]
fn test_shutdown_rejects_new_work() {
    let device = MockDevice::new("", AckMode::Echo);
    let stream = start(&device, 10);
    stream.shutdown();
    stream.shutdown();
    assert!(!stream.is_connected());
    assert_eq!(stream.enqueue("G0"), Err(ControllerError::NotConnected));
}

#[test]
fn test_wait_idle_times_out_without_acknowledgements() {
    let device = MockDevice::new("", AckMode::Manual);
    let stream = start(&device, 10);
    stream.enqueue("G0").unwrap();
    assert!(!stream.wait_idle(Duration::from_millis(30)));
    assert_eq!(stream.status().in_flight, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_every_line_written_once_in_order(
        lines in proptest::collection::vec("G1 X[0-9]{1,3}", 1..60),
        window in 1usize..16,
        chunks in 1usize..5,
    ) {
        let device = MockDevice::new("", AckMode::Echo);
        let stream = start(&device, window);

        for chunk in lines.chunks(lines.len().div_ceil(chunks)) {
            stream.enqueue(&chunk.join("\n")).unwrap();
        }
        prop_assert!(stream.wait_idle(WAIT));

        let status = stream.status();
        prop_assert_eq!(status.sent, lines.len());
        prop_assert_eq!(status.received, lines.len());
        prop_assert_eq!(device.lines(), lines);
        prop_assert!(device.max_outstanding() <= window);
    }
}
