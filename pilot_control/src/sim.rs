//! Simulated collaborators.
//!
//! Ideal actuators: the speed commanded in one cycle is the speed measured
//! in the next. The base integrates a unicycle model; the axis integrates
//! one coordinate. Each simulator hands out a measurement half and an
//! actuation half that share the same state, so one can be given to the
//! engine while the test (or binary) keeps a clone to observe it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use pilot_common::geometry::{PathPose, PolarVector, Pose};
use pilot_common::motion::DifferentialDriveParameters;

use crate::engine::drive::{DifferentialDrive, WHEELS};
use crate::engine::{ActuatorSink, Encoder, EncoderReading, Odometer, Odometry, TargetSource};

// ─── Base ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BaseState {
    pose: Pose,
    speed: PolarVector,
    commanded: PolarVector,
    duties: [f64; WHEELS],
    enabled: bool,
    blocked: bool,
}

/// Differential-drive base on a flat floor.
#[derive(Debug, Clone)]
pub struct SimulatedBase {
    state: Arc<Mutex<BaseState>>,
    drive: DifferentialDrive,
    dt: f64,
}

impl SimulatedBase {
    pub fn new(params: DifferentialDriveParameters, dt: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(BaseState::default())),
            drive: DifferentialDrive::new(params),
            dt,
        }
    }

    pub fn odometer(&self) -> SimOdometer {
        SimOdometer { base: self.clone() }
    }

    pub fn actuators(&self) -> SimActuators {
        SimActuators { base: self.clone() }
    }

    pub fn pose(&self) -> Pose {
        self.state.lock().pose
    }

    pub fn speed(&self) -> PolarVector {
        self.state.lock().speed
    }

    /// Last duties received [%].
    pub fn duties(&self) -> [f64; WHEELS] {
        self.state.lock().duties
    }

    /// Whether the wheels currently hold torque.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Pin the base against an obstacle: commands are accepted but it no
    /// longer moves.
    pub fn set_blocked(&self, blocked: bool) {
        self.state.lock().blocked = blocked;
    }

    fn advance(&self) -> Odometry {
        let mut s = self.state.lock();
        s.speed = if s.blocked || !s.enabled {
            PolarVector::zero()
        } else {
            s.commanded
        };
        let heading = s.pose.orientation().to_radians();
        let x = s.pose.x() + s.speed.distance * heading.cos() * self.dt;
        let y = s.pose.y() + s.speed.distance * heading.sin() * self.dt;
        let orientation = s.pose.orientation() + s.speed.angle * self.dt;
        s.pose = Pose::new(x, y, orientation);
        Odometry {
            pose: s.pose,
            speed: s.speed,
        }
    }
}

/// Odometry half of a [`SimulatedBase`].
#[derive(Debug, Clone)]
pub struct SimOdometer {
    base: SimulatedBase,
}

impl Odometer for SimOdometer {
    fn sample(&mut self) -> Odometry {
        self.base.advance()
    }

    fn reset_pose(&mut self, pose: Pose) {
        self.base.state.lock().pose = pose;
    }
}

/// Wheel half of a [`SimulatedBase`].
#[derive(Debug, Clone)]
pub struct SimActuators {
    base: SimulatedBase,
}

impl ActuatorSink for SimActuators {
    fn apply(&mut self, commands: &[f64]) {
        let mut duties = [0.0; WHEELS];
        for (d, c) in duties.iter_mut().zip(commands) {
            *d = *c;
        }
        let commanded = self.base.drive.speed_from_duties(duties);
        let mut s = self.base.state.lock();
        s.duties = duties;
        s.commanded = commanded;
        s.enabled = true;
    }

    fn disable(&mut self) {
        let mut s = self.base.state.lock();
        s.duties = [0.0; WHEELS];
        s.commanded = PolarVector::zero();
        s.enabled = false;
    }
}

// ─── Axis ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct AxisState {
    position: f64,
    speed: f64,
    commanded: f64,
    enabled: bool,
    blocked: bool,
}

/// Single linear axis driven in speed units.
#[derive(Debug, Clone)]
pub struct SimulatedAxis {
    state: Arc<Mutex<AxisState>>,
    dt: f64,
}

impl SimulatedAxis {
    pub fn new(dt: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(AxisState::default())),
            dt,
        }
    }

    pub fn encoder(&self) -> SimEncoder {
        SimEncoder { axis: self.clone() }
    }

    pub fn actuator(&self) -> SimAxisActuator {
        SimAxisActuator { axis: self.clone() }
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    pub fn commanded(&self) -> f64 {
        self.state.lock().commanded
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.state.lock().blocked = blocked;
    }
}

#[derive(Debug, Clone)]
pub struct SimEncoder {
    axis: SimulatedAxis,
}

impl Encoder for SimEncoder {
    fn sample(&mut self) -> EncoderReading {
        let mut s = self.axis.state.lock();
        s.speed = if s.blocked || !s.enabled {
            0.0
        } else {
            s.commanded
        };
        s.position += s.speed * self.axis.dt;
        EncoderReading {
            position: s.position,
            speed: s.speed,
        }
    }

    fn reset_position(&mut self, position: f64) {
        self.axis.state.lock().position = position;
    }
}

#[derive(Debug, Clone)]
pub struct SimAxisActuator {
    axis: SimulatedAxis,
}

impl ActuatorSink for SimAxisActuator {
    fn apply(&mut self, commands: &[f64]) {
        let mut s = self.axis.state.lock();
        s.commanded = commands.first().copied().unwrap_or(0.0);
        s.enabled = true;
    }

    fn disable(&mut self) {
        let mut s = self.axis.state.lock();
        s.commanded = 0.0;
        s.enabled = false;
    }
}

// ─── Waypoints ──────────────────────────────────────────────────────

/// Shared FIFO of path poses.
///
/// Clones share the queue, so a caller can keep pushing (or watch it
/// drain) while the engine owns another clone as its target source.
#[derive(Debug, Clone, Default)]
pub struct WaypointQueue {
    poses: Arc<Mutex<VecDeque<PathPose>>>,
    hold: Arc<AtomicBool>,
}

impl WaypointQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a path through `poses`; every pose but the last is
    /// intermediate.
    pub fn path(poses: impl IntoIterator<Item = Pose>) -> Self {
        let queue = Self::new();
        queue.extend_path(poses);
        queue
    }

    pub fn push(&self, pose: PathPose) {
        self.poses.lock().push_back(pose);
    }

    /// Append a path; see [`path`](Self::path).
    pub fn extend_path(&self, poses: impl IntoIterator<Item = Pose>) {
        let poses: Vec<Pose> = poses.into_iter().collect();
        let last = poses.len().saturating_sub(1);
        let mut queue = self.poses.lock();
        for (i, pose) in poses.into_iter().enumerate() {
            queue.push_back(PathPose::new(pose).with_intermediate(i != last));
        }
    }

    pub fn len(&self) -> usize {
        self.poses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.lock().is_empty()
    }

    /// Keep the engine on its current pose even once reached.
    pub fn set_hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::Release);
    }
}

impl TargetSource for WaypointQueue {
    fn current(&self) -> Option<PathPose> {
        self.poses.lock().front().copied()
    }

    fn may_advance(&self) -> bool {
        !self.hold.load(Ordering::Acquire)
    }

    fn advance(&mut self) {
        self.poses.lock().pop_front();
    }
}
