//! Periodic engine snapshots.
//!
//! `TelemetrySnapshot` is a fixed 96-byte record so it can be copied into a
//! ring buffer or a wire frame without conversion. The cycle only pushes
//! snapshots into a bounded [`TelemetryQueue`]; a [`TelemetryPublisher`]
//! drains it into a [`TelemetrySink`] off the cycle thread, either on its
//! own [`TelemetryWorker`] thread or by explicit [`TelemetryPublisher::drain`].
//!
//! Two sinks are provided: newline-delimited JSON on any writer, and
//! structured `tracing` events.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use heapless::Deque;
use parking_lot::Mutex;
use serde::Serialize;
use static_assertions::const_assert_eq;
use tracing::{debug, info, warn};

use super::collaborators::TelemetrySink;
use super::state::EngineControlState;
use crate::error::{CycleError, TelemetryError};

/// Snapshots the queue holds before the cycle starts dropping them.
pub const TELEMETRY_QUEUE_DEPTH: usize = 64;

/// Engine state at the end of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[repr(C)]
pub struct TelemetrySnapshot {
    pub cycle: u64,
    /// `ControlMode` discriminant.
    pub mode: u8,
    /// `PoseStatus` discriminant.
    pub pose_status: u8,
    pub pose_reached: u8,
    pub pose_intermediate: u8,
    pub blocking_cycles: u32,
    pub pose_x: f64,
    pub pose_y: f64,
    pub pose_orientation: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub target_orientation: f64,
    pub speed_linear: f64,
    pub speed_angular: f64,
    pub command_linear: f64,
    pub command_angular: f64,
}

const_assert_eq!(core::mem::size_of::<TelemetrySnapshot>(), 96);

impl TelemetrySnapshot {
    pub fn capture(state: &EngineControlState) -> Self {
        Self {
            cycle: state.current_cycle,
            mode: state.mode as u8,
            pose_status: state.pose_status as u8,
            pose_reached: u8::from(state.pose_reached),
            pose_intermediate: u8::from(state.pose_intermediate),
            blocking_cycles: state.blocking_cycles,
            pose_x: state.pose_current.x(),
            pose_y: state.pose_current.y(),
            pose_orientation: state.pose_current.orientation(),
            target_x: state.pose_target.pose.x(),
            target_y: state.pose_target.pose.y(),
            target_orientation: state.pose_target.pose.orientation(),
            speed_linear: state.speed_current.distance,
            speed_angular: state.speed_current.angle,
            command_linear: state.speed_command.distance,
            command_angular: state.speed_command.angle,
        }
    }
}

// ─── Queue ──────────────────────────────────────────────────────────

struct QueueShared {
    snapshots: Mutex<Deque<TelemetrySnapshot, TELEMETRY_QUEUE_DEPTH>>,
    dropped: AtomicU64,
}

/// Bounded hand-off from the cycle to the publisher.
///
/// `push` never allocates and never waits on the sink: the lock only
/// guards a copy into fixed storage. A full queue drops the new snapshot
/// and counts it.
#[derive(Clone)]
pub struct TelemetryQueue {
    shared: Arc<QueueShared>,
}

impl TelemetryQueue {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(QueueShared {
                snapshots: Mutex::new(Deque::new()),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Returns `false` when the snapshot was dropped.
    pub fn push(&self, snapshot: TelemetrySnapshot) -> bool {
        let accepted = self.shared.snapshots.lock().push_back(snapshot).is_ok();
        if !accepted {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    pub fn pop(&self) -> Option<TelemetrySnapshot> {
        self.shared.snapshots.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.shared.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots dropped on a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl Default for TelemetryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TelemetryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryQueue")
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

// ─── Publisher ──────────────────────────────────────────────────────

/// Drains a [`TelemetryQueue`] into a sink.
pub struct TelemetryPublisher {
    queue: TelemetryQueue,
    sink: Box<dyn TelemetrySink>,
    published: u64,
    failed: u64,
    dropped_seen: u64,
}

impl TelemetryPublisher {
    pub fn new(sink: impl TelemetrySink + 'static) -> Self {
        Self {
            queue: TelemetryQueue::new(),
            sink: Box::new(sink),
            published: 0,
            failed: 0,
            dropped_seen: 0,
        }
    }

    /// Producer side, handed to an engine builder.
    pub fn queue(&self) -> TelemetryQueue {
        self.queue.clone()
    }

    /// Publish everything queued so far. Returns the number of snapshots
    /// taken off the queue, including those the sink rejected.
    pub fn drain(&mut self) -> usize {
        let mut taken = 0;
        while let Some(snapshot) = self.queue.pop() {
            taken += 1;
            match self.sink.publish(&snapshot) {
                Ok(()) => self.published += 1,
                Err(e) => {
                    self.failed += 1;
                    warn!(cycle = snapshot.cycle, "telemetry publish failed: {e}");
                }
            }
        }
        let dropped = self.queue.dropped();
        if dropped > self.dropped_seen {
            warn!(
                lost = dropped - self.dropped_seen,
                total = dropped,
                "telemetry queue full, snapshots dropped"
            );
            self.dropped_seen = dropped;
        }
        taken
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Drain on a dedicated thread every `period` until stopped.
    pub fn spawn(self, period: Duration) -> Result<TelemetryWorker, CycleError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let mut publisher = self;
        let thread = thread::Builder::new()
            .name("pilot-telemetry".to_string())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    publisher.drain();
                    thread::sleep(period);
                }
                publisher.drain();
                publisher
            })?;
        debug!(period_ms = period.as_millis() as u64, "telemetry worker started");
        Ok(TelemetryWorker {
            stop,
            thread: Some(thread),
        })
    }
}

impl std::fmt::Debug for TelemetryPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryPublisher")
            .field("queue", &self.queue)
            .field("published", &self.published)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// Publisher running on its own thread.
#[derive(Debug)]
pub struct TelemetryWorker {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<TelemetryPublisher>>,
}

impl TelemetryWorker {
    /// Stop after a final drain and hand the publisher back.
    pub fn join(mut self) -> Result<TelemetryPublisher, CycleError> {
        self.stop.store(true, Ordering::Release);
        let thread = self.thread.take().ok_or(CycleError::Panicked)?;
        let publisher = thread.join().map_err(|_| CycleError::Panicked)?;
        debug!(
            published = publisher.published,
            failed = publisher.failed,
            "telemetry worker stopped"
        );
        Ok(publisher)
    }
}

impl Drop for TelemetryWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ─── Sinks ──────────────────────────────────────────────────────────

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonLinesTelemetry<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesTelemetry<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesTelemetry<W> {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<(), TelemetryError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Emits each snapshot as an `info` event on the `telemetry` target.
#[derive(Debug, Clone, Default)]
pub struct LogTelemetry {
    name: String,
}

impl LogTelemetry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TelemetrySink for LogTelemetry {
    fn publish(&mut self, s: &TelemetrySnapshot) -> Result<(), TelemetryError> {
        info!(
            target: "telemetry",
            engine = %self.name,
            cycle = s.cycle,
            mode = s.mode,
            status = s.pose_status,
            x = s.pose_x,
            y = s.pose_y,
            orientation = s.pose_orientation,
            linear = s.speed_linear,
            angular = s.speed_angular,
            "snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_common::geometry::{PathPose, PolarVector, Pose};
    use pilot_common::motion::{ControlMode, PoseStatus};

    fn state() -> EngineControlState {
        EngineControlState {
            pose_current: Pose::new(10.0, -5.0, 45.0),
            pose_target: PathPose::new(Pose::new(100.0, 0.0, 90.0)),
            speed_current: PolarVector::speed(120.0, 3.0),
            speed_command: PolarVector::speed(130.0, 2.0),
            mode: ControlMode::Running,
            pose_status: PoseStatus::Moving,
            current_cycle: 42,
            ..Default::default()
        }
    }

    #[test]
    fn capture_copies_state() {
        let s = TelemetrySnapshot::capture(&state());
        assert_eq!(s.cycle, 42);
        assert_eq!(s.mode, ControlMode::Running as u8);
        assert_eq!(s.pose_orientation, 45.0);
        assert_eq!(s.target_x, 100.0);
        assert_eq!(s.command_linear, 130.0);
    }

    #[test]
    fn json_lines_one_object_per_publish() {
        let mut sink = JsonLinesTelemetry::new(Vec::new());
        let snap = TelemetrySnapshot::capture(&state());
        sink.publish(&snap).unwrap();
        sink.publish(&snap).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["cycle"], 42);
        assert_eq!(value["pose_x"], 10.0);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let queue = TelemetryQueue::new();
        for cycle in 0..TELEMETRY_QUEUE_DEPTH as u64 + 3 {
            queue.push(TelemetrySnapshot {
                cycle,
                ..Default::default()
            });
        }
        assert_eq!(queue.len(), TELEMETRY_QUEUE_DEPTH);
        assert_eq!(queue.dropped(), 3);
        // Oldest snapshots survive.
        assert_eq!(queue.pop().map(|s| s.cycle), Some(0));
    }

    #[test]
    fn drain_publishes_in_order() {
        let mut publisher = TelemetryPublisher::new(JsonLinesTelemetry::new(Vec::new()));
        let queue = publisher.queue();
        for cycle in [5, 10, 15] {
            assert!(queue.push(TelemetrySnapshot {
                cycle,
                ..Default::default()
            }));
        }
        assert_eq!(publisher.drain(), 3);
        assert_eq!(publisher.drain(), 0);
        assert_eq!(publisher.published(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn worker_drains_before_join_returns() {
        let publisher = TelemetryPublisher::new(LogTelemetry::new("base"));
        let queue = publisher.queue();
        let worker = publisher.spawn(Duration::from_millis(1)).unwrap();
        for cycle in 0..10 {
            queue.push(TelemetrySnapshot {
                cycle,
                ..Default::default()
            });
        }
        let publisher = worker.join().unwrap();
        assert_eq!(publisher.published(), 10);
        assert!(queue.is_empty());
    }

    #[test]
    fn log_sink_never_fails() {
        let mut sink = LogTelemetry::new("base");
        assert!(sink.publish(&TelemetrySnapshot::default()).is_ok());
    }
}
