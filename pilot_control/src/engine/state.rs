//! Engine-owned control state and parameters.

use pilot_common::geometry::{PathPose, PolarVector, Pose};
use pilot_common::motion::{ControlMode, PoseStatus, TimeoutParameters};

/// Everything one engine knows about its motion, updated every cycle.
///
/// Motor engines use the linear components only: `pose_*.x` is the axis
/// position and `*.distance` its speed.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineControlState {
    pub pose_current: Pose,
    pub pose_target: PathPose,
    pub speed_current: PolarVector,
    /// Requested speed: caller order in speed modes, target ratios times
    /// the configured maxima in pose mode.
    pub speed_order: PolarVector,
    /// Order the speed loop actually tracked after ramping.
    pub speed_order_filtered: PolarVector,
    /// Command last sent to the actuators.
    pub speed_command: PolarVector,
    pub pose_reached: bool,
    pub pose_intermediate: bool,
    pub pose_status: PoseStatus,
    pub blocking_cycles: u32,
    pub mode: ControlMode,
    pub current_cycle: u64,
    /// Cycle at which the active command was issued.
    pub command_cycle: u64,
    pub path_follow: bool,
}

impl Default for EngineControlState {
    fn default() -> Self {
        Self {
            pose_current: Pose::default(),
            pose_target: PathPose::default(),
            speed_current: PolarVector::zero(),
            speed_order: PolarVector::zero(),
            speed_order_filtered: PolarVector::zero(),
            speed_command: PolarVector::zero(),
            pose_reached: false,
            pose_intermediate: false,
            pose_status: PoseStatus::Moving,
            blocking_cycles: 0,
            mode: ControlMode::Stop,
            current_cycle: 0,
            command_cycle: 0,
            path_follow: false,
        }
    }
}

impl EngineControlState {
    /// Cycles elapsed since the active command was issued.
    #[inline]
    pub fn cycles_since_command(&self) -> u64 {
        self.current_cycle.saturating_sub(self.command_cycle)
    }

    /// Clear per-target progress when a new command is accepted.
    pub(crate) fn begin_command(&mut self) {
        self.pose_reached = false;
        self.pose_intermediate = false;
        self.pose_status = PoseStatus::Moving;
        self.blocking_cycles = 0;
        self.command_cycle = self.current_cycle;
    }
}

/// Engine-level knobs that are not owned by a tree leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParameters {
    /// Cycle period [s].
    pub dt: f64,
    /// Linear speed reached at a ratio of 1 [mm/s].
    pub max_linear_speed: f64,
    /// Angular speed reached at a ratio of 1 [deg/s]. Unused by motors.
    pub max_angular_speed: f64,
    pub timeout: TimeoutParameters,
    /// Publish telemetry every N cycles; 0 disables.
    pub telemetry_interval: u32,
}

impl EngineParameters {
    /// Speed order for a pose target: configured maxima scaled by the
    /// target's clamped ratios.
    pub fn pose_speed_order(&self, target: &PathPose) -> PolarVector {
        let (linear, angular) = target.clamped_ratios();
        PolarVector::speed(
            self.max_linear_speed * linear,
            self.max_angular_speed * angular,
        )
    }

    /// Whether the active command has outlived its timeout.
    #[inline]
    pub fn timed_out(&self, state: &EngineControlState) -> bool {
        self.timeout.enabled
            && state.cycles_since_command() > u64::from(self.timeout.timeout_cycle_number)
    }
}
