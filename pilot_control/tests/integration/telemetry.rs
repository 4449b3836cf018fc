//! Telemetry queued by the cycle and published by a separate drain.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pilot_common::motion::{ControlMode, PoseStatus};
use pilot_control::engine::{
    JsonLinesTelemetry, PlatformEngine, TELEMETRY_QUEUE_DEPTH, TelemetryPublisher, TelemetrySink,
    TelemetrySnapshot,
};
use pilot_control::error::TelemetryError;

use super::*;

/// Writer whose bytes stay readable after the engine takes ownership.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct BrokenSink {
    attempts: Arc<Mutex<u32>>,
}

impl TelemetrySink for BrokenSink {
    fn publish(&mut self, _snapshot: &TelemetrySnapshot) -> Result<(), TelemetryError> {
        *self.attempts.lock().unwrap() += 1;
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone").into())
    }
}

fn with_sink(
    sink: impl TelemetrySink + 'static,
    interval: u32,
) -> (EngineHandle, SimulatedBase, TelemetryPublisher) {
    let config = platform_config();
    let base = SimulatedBase::new(config.drive, DT);
    let publisher = TelemetryPublisher::new(sink);
    let engine = PlatformEngine::new(config, DT, base.odometer(), base.actuators())
        .telemetry(publisher.queue(), interval)
        .build()
        .unwrap();
    let handle = EngineHandle::new(engine);
    handle.enable().unwrap();
    (handle, base, publisher)
}

#[test]
fn snapshot_every_interval_cycles() {
    let buffer = SharedBuffer::default();
    let (handle, _base, mut publisher) = with_sink(JsonLinesTelemetry::new(buffer.clone()), 5);
    handle.set_pose_target(target(300.0, 0.0, 0.0)).unwrap();
    for _ in 0..20 {
        handle.step();
    }
    // Nothing reaches the writer from inside the cycle.
    assert!(buffer.lines().is_empty());
    assert_eq!(publisher.drain(), 4);

    let lines = buffer.lines();
    let cycles: Vec<u64> = lines.iter().map(|l| l["cycle"].as_u64().unwrap()).collect();
    assert_eq!(cycles, vec![5, 10, 15, 20]);

    let last = &lines[3];
    assert_eq!(last["mode"], ControlMode::Running as u8);
    assert_eq!(last["pose_status"], PoseStatus::Moving as u8);
    assert_eq!(last["target_x"], 300.0);
    assert!(last["pose_x"].as_f64().unwrap() > 0.0);
}

#[test]
fn zero_interval_publishes_nothing() {
    let buffer = SharedBuffer::default();
    let (handle, _base, mut publisher) = with_sink(JsonLinesTelemetry::new(buffer.clone()), 0);
    for _ in 0..20 {
        handle.step();
    }
    assert_eq!(publisher.drain(), 0);
    assert!(buffer.lines().is_empty());
}

#[test]
fn failing_sink_does_not_stop_the_engine() {
    let attempts = Arc::new(Mutex::new(0));
    let (handle, base, mut publisher) = with_sink(
        BrokenSink {
            attempts: Arc::clone(&attempts),
        },
        2,
    );
    handle.set_pose_target(target(300.0, 0.0, 0.0)).unwrap();
    for _ in 0..10 {
        handle.step();
    }
    publisher.drain();

    assert_eq!(*attempts.lock().unwrap(), 5);
    assert_eq!(publisher.failed(), 5);
    assert_eq!(handle.mode(), ControlMode::Running);
    assert!(base.pose().x() > 0.0);
}

#[test]
fn undrained_queue_drops_instead_of_stalling() {
    let buffer = SharedBuffer::default();
    let (handle, _base, mut publisher) = with_sink(JsonLinesTelemetry::new(buffer.clone()), 1);
    handle.set_pose_target(target(300.0, 0.0, 0.0)).unwrap();
    let extra = 10;
    for _ in 0..TELEMETRY_QUEUE_DEPTH + extra {
        handle.step();
    }

    let queue = publisher.queue();
    assert_eq!(queue.len(), TELEMETRY_QUEUE_DEPTH);
    assert_eq!(queue.dropped(), extra as u64);
    assert_eq!(handle.mode(), ControlMode::Running);

    assert_eq!(publisher.drain(), TELEMETRY_QUEUE_DEPTH);
    let cycles: Vec<u64> = buffer
        .lines()
        .iter()
        .map(|l| l["cycle"].as_u64().unwrap())
        .collect();
    assert_eq!(cycles.first(), Some(&1));
    assert_eq!(cycles.last(), Some(&(TELEMETRY_QUEUE_DEPTH as u64)));
}

#[test]
fn worker_thread_publishes_while_engine_steps() {
    let buffer = SharedBuffer::default();
    let (handle, _base, publisher) = with_sink(JsonLinesTelemetry::new(buffer.clone()), 1);
    let worker = publisher.spawn(Duration::from_millis(1)).unwrap();
    handle.set_pose_target(target(300.0, 0.0, 0.0)).unwrap();
    for _ in 0..30 {
        handle.step();
    }
    let publisher = worker.join().unwrap();

    assert_eq!(publisher.published(), 30);
    assert_eq!(buffer.lines().len(), 30);
}
