//! Differential-drive platform engine.
//!
//! Regulates the vehicle pose (or polar speed) through the platform tree,
//! turns the polar command into wheel duties and, when path following is
//! on, pulls its targets from a [`TargetSource`].

use std::fmt;

use pilot_common::geometry::{PathPose, PolarVector, Pose};
use pilot_common::motion::PlatformConfig;
use tracing::debug;

use super::collaborators::{ActuatorSink, Odometer, TargetSource};
use super::controller::{ControllerEngine, EngineParts, Profile, check_period};
use super::drive::{DifferentialDrive, WHEELS};
use super::hooks::{CycleHooks, NoHooks};
use super::state::{EngineControlState, EngineParameters};
use super::telemetry::TelemetryQueue;
use crate::control::chains::{platform_in, platform_out, platform_tree};
use crate::control::io::IoVector;
use crate::error::EngineError;

/// Measurement, actuation and path plumbing for a platform engine.
pub struct PlatformProfile {
    odometer: Box<dyn Odometer>,
    actuators: Box<dyn ActuatorSink>,
    drive: DifferentialDrive,
    targets: Option<Box<dyn TargetSource>>,
    path_loaded: bool,
}

impl PlatformProfile {
    pub(crate) fn sample(&mut self, state: &mut EngineControlState) {
        let odometry = self.odometer.sample();
        state.pose_current = odometry.pose;
        state.speed_current = odometry.speed;
    }

    pub(crate) fn fill_inputs(
        &self,
        state: &EngineControlState,
        speed_mode: bool,
        inputs: &mut IoVector,
    ) {
        let current = &state.pose_current;
        let target = &state.pose_target;
        inputs.set(platform_in::CURRENT_X, current.x());
        inputs.set(platform_in::CURRENT_Y, current.y());
        inputs.set(platform_in::CURRENT_O, current.orientation());
        inputs.set(platform_in::TARGET_X, target.pose.x());
        inputs.set(platform_in::TARGET_Y, target.pose.y());
        inputs.set(platform_in::TARGET_O, target.pose.orientation());
        inputs.set(platform_in::LINEAR_SPEED, state.speed_current.distance);
        inputs.set(platform_in::ANGULAR_SPEED, state.speed_current.angle);
        inputs.set(platform_in::LINEAR_ORDER, state.speed_order.distance);
        inputs.set(platform_in::ANGULAR_ORDER, state.speed_order.angle);
        inputs.set(platform_in::ALLOW_REVERSE, flag(target.allow_reverse));
        inputs.set(platform_in::INTERMEDIATE, flag(target.intermediate));
        inputs.set(platform_in::SPEED_MODE, flag(speed_mode));
    }

    pub(crate) fn read_outputs(&self, state: &mut EngineControlState, outputs: &IoVector) {
        state.speed_command = PolarVector::speed(
            outputs.get(platform_out::LINEAR_COMMAND),
            outputs.get(platform_out::ANGULAR_COMMAND),
        );
        state.speed_order_filtered = PolarVector::speed(
            outputs.get(platform_out::LINEAR_ORDER),
            outputs.get(platform_out::ANGULAR_ORDER),
        );
    }

    pub(crate) fn apply(&mut self, command: PolarVector) {
        let duties = self.drive.duties(command);
        self.actuators.apply(&duties);
    }

    pub(crate) fn halt(&mut self) {
        self.actuators.apply(&[0.0; WHEELS]);
    }

    pub(crate) fn release(&mut self) {
        self.actuators.disable();
    }

    pub(crate) fn reset_pose(&mut self, pose: Pose) {
        self.odometer.reset_pose(pose);
    }

    /// Path pose to load this cycle, if any.
    ///
    /// The first pose is loaded as soon as one is available; later poses
    /// only once the active one is reached and the source allows it.
    pub(crate) fn next_path_pose(&mut self, state: &EngineControlState) -> Option<PathPose> {
        let source = self.targets.as_mut()?;
        if !self.path_loaded {
            let first = source.current()?;
            self.path_loaded = true;
            return Some(first);
        }
        if !(state.pose_reached && source.may_advance()) {
            return None;
        }
        source.advance();
        let next = source.current();
        self.path_loaded = next.is_some();
        if next.is_none() {
            debug!("path complete");
        }
        next
    }
}

#[inline]
fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Builder for a platform [`ControllerEngine`].
pub struct PlatformEngine {
    config: PlatformConfig,
    dt: f64,
    odometer: Box<dyn Odometer>,
    actuators: Box<dyn ActuatorSink>,
    targets: Option<Box<dyn TargetSource>>,
    hooks: Box<dyn CycleHooks>,
    telemetry: Option<TelemetryQueue>,
    telemetry_interval: u32,
}

impl fmt::Debug for PlatformEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformEngine")
            .field("config", &self.config)
            .field("dt", &self.dt)
            .field("path_source", &self.targets.is_some())
            .field("telemetry", &self.telemetry)
            .field("telemetry_interval", &self.telemetry_interval)
            .finish_non_exhaustive()
    }
}

impl PlatformEngine {
    /// `dt` is the cycle period in seconds.
    pub fn new(
        config: PlatformConfig,
        dt: f64,
        odometer: impl Odometer + 'static,
        actuators: impl ActuatorSink + 'static,
    ) -> Self {
        Self {
            config,
            dt,
            odometer: Box::new(odometer),
            actuators: Box::new(actuators),
            targets: None,
            hooks: Box::new(NoHooks),
            telemetry: None,
            telemetry_interval: 0,
        }
    }

    pub fn target_source(mut self, source: impl TargetSource + 'static) -> Self {
        self.targets = Some(Box::new(source));
        self
    }

    pub fn hooks(mut self, hooks: impl CycleHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Queue a snapshot every `interval` cycles for a
    /// [`TelemetryPublisher`](super::telemetry::TelemetryPublisher).
    pub fn telemetry(mut self, queue: TelemetryQueue, interval: u32) -> Self {
        self.telemetry = Some(queue);
        self.telemetry_interval = interval;
        self
    }

    pub fn build(self) -> Result<ControllerEngine, EngineError> {
        self.config.validate()?;
        check_period(self.dt)?;
        let tree = platform_tree(&self.config, self.dt)?;
        let params = EngineParameters {
            dt: self.dt,
            max_linear_speed: self.config.max_linear_speed,
            max_angular_speed: self.config.max_angular_speed,
            timeout: self.config.timeout,
            telemetry_interval: self.telemetry_interval,
        };
        let profile = Profile::Platform(PlatformProfile {
            odometer: self.odometer,
            actuators: self.actuators,
            drive: DifferentialDrive::new(self.config.drive),
            targets: self.targets,
            path_loaded: false,
        });
        Ok(ControllerEngine::new(EngineParts {
            name: "platform".to_string(),
            tree,
            params,
            blocking: self.config.blocking,
            pose_reached: self.config.pose_reached,
            path_follow: self.config.path_follow,
            profile,
            hooks: self.hooks,
            telemetry: self.telemetry,
        }))
    }
}
