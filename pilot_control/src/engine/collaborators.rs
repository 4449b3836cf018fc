//! Interfaces to the world outside the controller tree.
//!
//! Measurement, path and actuator collaborators are owned by their engine
//! and called from the cycle thread only, hence `Send` and `&mut self`.
//! A telemetry sink is owned by a publisher on its own thread.

use pilot_common::geometry::{PathPose, PolarVector, Pose};

use crate::engine::telemetry::TelemetrySnapshot;
use crate::error::TelemetryError;

/// One odometry sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Odometry {
    pub pose: Pose,
    /// Linear [mm/s] and angular [deg/s] speed.
    pub speed: PolarVector,
}

/// One encoder sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncoderReading {
    pub position: f64,
    pub speed: f64,
}

/// Platform measurement source.
pub trait Odometer: Send {
    /// Sample pose and speed for this cycle.
    fn sample(&mut self) -> Odometry;

    /// Re-seat the odometry on a known pose.
    fn reset_pose(&mut self, pose: Pose);
}

/// Single-axis measurement source.
pub trait Encoder: Send {
    fn sample(&mut self) -> EncoderReading;

    fn reset_position(&mut self, position: f64);
}

/// Supplier of path poses for platform path following.
pub trait TargetSource: Send {
    /// Pose the platform should be heading for, if any.
    fn current(&self) -> Option<PathPose>;

    /// Whether the source allows moving past the current pose now.
    fn may_advance(&self) -> bool {
        true
    }

    /// Drop the current pose.
    fn advance(&mut self);
}

/// Destination of per-actuator commands.
pub trait ActuatorSink: Send {
    /// One signed command per actuator, in actuator order.
    fn apply(&mut self, commands: &[f64]);

    /// Release the actuators (no holding torque).
    fn disable(&mut self);
}

/// Consumer of periodic engine snapshots.
///
/// Called by a [`TelemetryPublisher`](crate::engine::TelemetryPublisher),
/// never from the cycle. Errors are logged and the snapshot is dropped.
pub trait TelemetrySink: Send {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<(), TelemetryError>;
}
