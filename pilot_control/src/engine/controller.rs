//! The periodic controller engine.
//!
//! `ControllerEngine` owns one controller tree together with the run-mode
//! machine, stall detection, pose-reached evaluation and the command
//! timeout. [`ControllerEngine::step`] runs exactly one cycle:
//!
//! 1. load the next path pose (platform, path following on)
//! 2. sample measurements
//! 3. pre-mode hook
//! 4. compute the tree (Running / RunningSpeed), forward the order
//!    (Passthrough) or hold zero (Stop / Idle / Blocked)
//! 5. issue actuator commands
//! 6. post-mode hook
//! 7. blocking detection
//! 8. pose-reached evaluation
//! 9. command timeout
//! 10. throttled telemetry (queued, published off the cycle thread)
//!
//! Runtime control faults never surface as `Err`: they become mode
//! transitions (`Blocked`) or status flags (`Timeout`).

use pilot_common::config::ConfigError;
use pilot_common::geometry::{PathPose, PolarVector, Pose};
use pilot_common::motion::{
    BlockingParameters, ControlMode, PoseReachedParameters, PoseStatus, TimeoutParameters,
};
use tracing::{debug, info, trace, warn};

use super::blocking::BlockingDetector;
use super::hooks::CycleHooks;
use super::mode::{ModeEvent, ModeMachine, ModeTransition};
use super::motor::MotorProfile;
use super::platform::PlatformProfile;
use super::reached::PoseReachedEvaluator;
use super::state::{EngineControlState, EngineParameters};
use super::telemetry::{TelemetryQueue, TelemetrySnapshot};
use crate::control::io::IoVector;
use crate::control::leaf::LeafParameters;
use crate::control::tree::Controller;
use crate::error::EngineError;

// ─── Profiles ───────────────────────────────────────────────────────

/// What differs between engine kinds: measurement, tree I/O layout and
/// actuation.
pub(crate) enum Profile {
    Platform(PlatformProfile),
    Motor(MotorProfile),
}

impl Profile {
    fn sample(&mut self, state: &mut EngineControlState) {
        match self {
            Profile::Platform(p) => p.sample(state),
            Profile::Motor(m) => m.sample(state),
        }
    }

    fn fill_inputs(&self, state: &EngineControlState, speed_mode: bool, inputs: &mut IoVector) {
        match self {
            Profile::Platform(p) => p.fill_inputs(state, speed_mode, inputs),
            Profile::Motor(m) => m.fill_inputs(state, speed_mode, inputs),
        }
    }

    fn read_outputs(&self, state: &mut EngineControlState, outputs: &IoVector) {
        match self {
            Profile::Platform(p) => p.read_outputs(state, outputs),
            Profile::Motor(m) => m.read_outputs(state, outputs),
        }
    }

    fn apply(&mut self, command: PolarVector) {
        match self {
            Profile::Platform(p) => p.apply(command),
            Profile::Motor(m) => m.apply(command),
        }
    }

    fn halt(&mut self) {
        match self {
            Profile::Platform(p) => p.halt(),
            Profile::Motor(m) => m.halt(),
        }
    }

    fn release(&mut self) {
        match self {
            Profile::Platform(p) => p.release(),
            Profile::Motor(m) => m.release(),
        }
    }

    fn reset_pose(&mut self, pose: Pose) {
        match self {
            Profile::Platform(p) => p.reset_pose(pose),
            Profile::Motor(m) => m.reset_pose(pose),
        }
    }

    fn next_path_pose(&mut self, state: &EngineControlState) -> Option<PathPose> {
        match self {
            Profile::Platform(p) => p.next_path_pose(state),
            Profile::Motor(_) => None,
        }
    }
}

/// Reject non-positive or non-finite cycle periods.
pub(crate) fn check_period(dt: f64) -> Result<(), EngineError> {
    if dt > 0.0 && dt.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid("cycle_time", format!("period must be > 0 s, got {dt}")).into())
    }
}

/// Everything a builder hands over to [`ControllerEngine::new`].
pub(crate) struct EngineParts {
    pub name: String,
    pub tree: Controller,
    pub params: EngineParameters,
    pub blocking: BlockingParameters,
    pub pose_reached: PoseReachedParameters,
    pub path_follow: bool,
    pub profile: Profile,
    pub hooks: Box<dyn CycleHooks>,
    pub telemetry: Option<TelemetryQueue>,
}

// ─── Engine ─────────────────────────────────────────────────────────

/// One controller tree driven on a fixed period.
///
/// Built by [`PlatformEngine`](super::platform::PlatformEngine) or
/// [`MotorEngine`](super::motor::MotorEngine); shared with other threads
/// through an [`EngineHandle`](super::handle::EngineHandle).
pub struct ControllerEngine {
    name: String,
    state: EngineControlState,
    params: EngineParameters,
    tree: Controller,
    machine: ModeMachine,
    blocking: BlockingDetector,
    reached: PoseReachedEvaluator,
    profile: Profile,
    hooks: Box<dyn CycleHooks>,
    telemetry: Option<TelemetryQueue>,
}

impl ControllerEngine {
    pub(crate) fn new(parts: EngineParts) -> Self {
        let state = EngineControlState {
            path_follow: parts.path_follow,
            ..Default::default()
        };
        info!(
            engine = %parts.name,
            inputs = parts.tree.input_len(),
            outputs = parts.tree.output_len(),
            "controller engine built"
        );
        Self {
            name: parts.name,
            state,
            params: parts.params,
            tree: parts.tree,
            machine: ModeMachine::new(),
            blocking: BlockingDetector::new(parts.blocking),
            reached: PoseReachedEvaluator::new(parts.pose_reached),
            profile: parts.profile,
            hooks: parts.hooks,
            telemetry: parts.telemetry,
        }
    }

    // ── Accessors ──

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &EngineControlState {
        &self.state
    }

    #[inline]
    pub fn mode(&self) -> ControlMode {
        self.machine.mode()
    }

    pub fn parameters(&self) -> &EngineParameters {
        &self.params
    }

    pub fn tree(&self) -> &Controller {
        &self.tree
    }

    pub fn blocking_parameters(&self) -> &BlockingParameters {
        self.blocking.parameters()
    }

    pub fn pose_reached_parameters(&self) -> &PoseReachedParameters {
        self.reached.parameters()
    }

    // ── Mode requests ──

    /// Feed a mode event. Rejected events leave the mode unchanged.
    pub fn handle_event(&mut self, event: ModeEvent) -> Result<ModeTransition, EngineError> {
        let mode = self.machine.mode();
        let transition = self.machine.handle_event(event);
        match transition {
            ModeTransition::Rejected(reason) => {
                debug!(engine = %self.name, %mode, ?event, reason, "mode event rejected");
                Err(EngineError::TransitionRejected {
                    mode,
                    event,
                    reason,
                })
            }
            ModeTransition::Ok { from, to } => {
                if from != to {
                    self.enter_mode(from, to);
                }
                if matches!(event, ModeEvent::Recover) {
                    self.begin_command();
                }
                Ok(transition)
            }
        }
    }

    /// Move to `mode` through the event that leads there.
    pub fn request_mode(&mut self, mode: ControlMode) -> Result<(), EngineError> {
        if mode == ControlMode::Idle && self.machine.mode() == ControlMode::Stop {
            self.handle_event(ModeEvent::Enable)?;
            return Ok(());
        }
        let event = ModeEvent::for_mode(mode);
        self.handle_event(event)?;
        if matches!(event, ModeEvent::PoseTarget | ModeEvent::SpeedTarget) {
            self.begin_command();
        }
        Ok(())
    }

    pub fn enable(&mut self) -> Result<(), EngineError> {
        self.handle_event(ModeEvent::Enable).map(|_| ())
    }

    /// Stop from any mode; never rejected.
    pub fn disable(&mut self) {
        let _ = self.handle_event(ModeEvent::Disable);
    }

    pub fn release(&mut self) -> Result<(), EngineError> {
        self.handle_event(ModeEvent::Release).map(|_| ())
    }

    /// Leave Blocked and resume the command that stalled, in the mode it
    /// was regulated in.
    pub fn recover(&mut self) -> Result<(), EngineError> {
        self.handle_event(ModeEvent::Recover).map(|_| ())
    }

    // ── Commands ──

    /// Regulate towards `target` (enters Running).
    ///
    /// The speed order becomes the configured maxima scaled by the target's
    /// ratios.
    pub fn set_pose_target(&mut self, target: PathPose) -> Result<(), EngineError> {
        self.handle_event(ModeEvent::PoseTarget)?;
        self.state.pose_target = target;
        self.state.speed_order = self.params.pose_speed_order(&target);
        self.begin_command();
        debug!(
            engine = %self.name,
            x = target.pose.x(),
            y = target.pose.y(),
            orientation = target.pose.orientation(),
            intermediate = target.intermediate,
            "pose target"
        );
        Ok(())
    }

    /// Regulate speed only (enters RunningSpeed).
    pub fn set_speed_target(&mut self, order: PolarVector) -> Result<(), EngineError> {
        self.handle_event(ModeEvent::SpeedTarget)?;
        self.state.speed_order = order;
        self.begin_command();
        debug!(engine = %self.name, linear = order.distance, angular = order.angle, "speed target");
        Ok(())
    }

    /// Forward `order` to the actuators unregulated (enters Passthrough).
    pub fn set_passthrough(&mut self, order: PolarVector) -> Result<(), EngineError> {
        self.handle_event(ModeEvent::Passthrough)?;
        self.state.speed_order = order;
        self.begin_command();
        Ok(())
    }

    /// Replace the speed order without changing mode.
    pub fn set_speed_order(&mut self, order: PolarVector) {
        self.state.speed_order = order;
    }

    /// Re-seat the measurement source on a known pose.
    pub fn set_pose_current(&mut self, pose: Pose) {
        self.profile.reset_pose(pose);
        self.state.pose_current = pose;
        debug!(engine = %self.name, x = pose.x(), y = pose.y(), "pose reset");
    }

    pub fn set_path_follow(&mut self, enabled: bool) {
        self.state.path_follow = enabled;
    }

    // ── Parameters ──

    /// Replace the parameter block of the leaf called `name`.
    pub fn set_controller_parameters(
        &mut self,
        name: &str,
        params: LeafParameters,
    ) -> Result<(), EngineError> {
        self.tree.set_parameters(name, params)?;
        debug!(engine = %self.name, leaf = name, "controller parameters updated");
        Ok(())
    }

    pub fn controller_parameters(&self, name: &str) -> Option<LeafParameters> {
        self.tree.parameters(name)
    }

    pub fn set_blocking_parameters(&mut self, params: BlockingParameters) -> Result<(), EngineError> {
        params
            .validate()
            .map_err(|e| ConfigError::invalid("blocking", e))?;
        self.blocking.set_parameters(params);
        if !params.anti_blocking_on {
            self.blocking.reset();
            self.state.blocking_cycles = 0;
        }
        Ok(())
    }

    pub fn set_pose_reached_parameters(
        &mut self,
        params: PoseReachedParameters,
    ) -> Result<(), EngineError> {
        params
            .validate()
            .map_err(|e| ConfigError::invalid("pose_reached", e))?;
        self.reached.set_parameters(params);
        Ok(())
    }

    pub fn set_timeout_parameters(&mut self, params: TimeoutParameters) -> Result<(), EngineError> {
        params
            .validate()
            .map_err(|e| ConfigError::invalid("timeout", e))?;
        self.params.timeout = params;
        Ok(())
    }

    // ── Cycle ──

    /// Run one control cycle.
    pub fn step(&mut self) {
        self.state.current_cycle = self.state.current_cycle.wrapping_add(1);

        self.follow_path();

        self.profile.sample(&mut self.state);
        self.hooks.pre_mode(&mut self.state);
        self.state.mode = self.machine.mode();

        let mode = self.machine.mode();
        match mode {
            ControlMode::Running | ControlMode::RunningSpeed => {
                let speed_mode = mode == ControlMode::RunningSpeed;
                self.profile
                    .fill_inputs(&self.state, speed_mode, self.tree.inputs_mut());
                self.tree.compute();
                self.profile.read_outputs(&mut self.state, self.tree.outputs());
                self.profile.apply(self.state.speed_command);
            }
            ControlMode::Passthrough => {
                self.state.speed_command = self.state.speed_order;
                self.state.speed_order_filtered = self.state.speed_order;
                self.profile.apply(self.state.speed_command);
            }
            ControlMode::Idle | ControlMode::Blocked => {
                self.zero_command();
                self.profile.halt();
            }
            ControlMode::Stop => self.zero_command(),
        }

        self.hooks.post_mode(&mut self.state);

        if mode.is_regulating() {
            self.check_blocking();
        }
        if self.machine.mode() == ControlMode::Running {
            self.check_pose_reached();
            self.check_timeout();
        }

        self.publish_telemetry();

        trace!(
            engine = %self.name,
            cycle = self.state.current_cycle,
            mode = %self.machine.mode(),
            linear = self.state.speed_command.distance,
            angular = self.state.speed_command.angle,
            "cycle"
        );
    }

    fn follow_path(&mut self) {
        if !self.state.path_follow
            || !matches!(
                self.machine.mode(),
                ControlMode::Idle | ControlMode::Running | ControlMode::RunningSpeed
            )
        {
            return;
        }
        if let Some(next) = self.profile.next_path_pose(&self.state) {
            if let Err(e) = self.set_pose_target(next) {
                warn!(engine = %self.name, "path pose not loaded: {e}");
            }
        }
    }

    fn check_blocking(&mut self) {
        let tripped = self.blocking.update(
            self.state.speed_order_filtered.distance,
            self.state.speed_current.distance,
        );
        self.state.blocking_cycles = self.blocking.cycles();
        if !tripped {
            return;
        }
        warn!(
            engine = %self.name,
            cycles = self.state.blocking_cycles,
            order = self.state.speed_order_filtered.distance,
            speed = self.state.speed_current.distance,
            "blocking detected"
        );
        let cycles = self.state.blocking_cycles;
        if self.handle_event(ModeEvent::Blocked).is_ok() {
            self.state.pose_status = PoseStatus::Blocked;
            self.state.blocking_cycles = cycles;
        }
    }

    fn check_pose_reached(&mut self) {
        if self.state.pose_reached {
            return;
        }
        let status = self
            .reached
            .evaluate(&self.state.pose_current, &self.state.pose_target);
        if !status.is_reached() {
            return;
        }
        self.state.pose_status = status;
        self.state.pose_reached = true;
        self.state.pose_intermediate = status == PoseStatus::IntermediateReached;
        debug!(
            engine = %self.name,
            cycle = self.state.current_cycle,
            intermediate = self.state.pose_intermediate,
            "pose reached"
        );
        self.hooks.pose_reached(&self.state);
    }

    fn check_timeout(&mut self) {
        if self.state.pose_reached || !self.params.timed_out(&self.state) {
            return;
        }
        warn!(
            engine = %self.name,
            cycles = self.state.cycles_since_command(),
            "command timed out"
        );
        let from = self.machine.mode();
        self.machine.force_idle();
        self.enter_mode(from, self.machine.mode());
        self.state.pose_status = PoseStatus::Timeout;
    }

    fn publish_telemetry(&self) {
        let interval = u64::from(self.params.telemetry_interval);
        if interval == 0 || self.state.current_cycle % interval != 0 {
            return;
        }
        // A full queue drops the snapshot; the publisher reports the loss.
        if let Some(queue) = self.telemetry.as_ref() {
            queue.push(TelemetrySnapshot::capture(&self.state));
        }
    }

    // ── Internals ──

    fn enter_mode(&mut self, from: ControlMode, to: ControlMode) {
        self.state.mode = to;
        self.tree.reset();
        self.blocking.reset();
        self.state.blocking_cycles = 0;
        info!(engine = %self.name, %from, %to, "mode transition");
        match to {
            ControlMode::Stop => {
                self.zero_command();
                self.profile.release();
            }
            ControlMode::Idle | ControlMode::Blocked => {
                self.zero_command();
                self.profile.halt();
            }
            _ => {}
        }
    }

    fn begin_command(&mut self) {
        self.state.begin_command();
        self.reached.reset();
    }

    fn zero_command(&mut self) {
        self.state.speed_command = PolarVector::zero();
        self.state.speed_order_filtered = PolarVector::zero();
    }
}

impl std::fmt::Debug for ControllerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerEngine")
            .field("name", &self.name)
            .field("mode", &self.machine.mode())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
