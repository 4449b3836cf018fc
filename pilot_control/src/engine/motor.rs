//! Single-axis motor engine.
//!
//! Same cycle as the platform engine on one linear axis: the state's
//! `pose_*.x` carries the position and `*.distance` the speed.

use std::fmt;

use pilot_common::geometry::{PolarVector, Pose};
use pilot_common::motion::{MotorConfig, PoseReachedParameters, PoseReachedPolicy};

use super::collaborators::{ActuatorSink, Encoder};
use super::controller::{ControllerEngine, EngineParts, Profile, check_period};
use super::hooks::{CycleHooks, NoHooks};
use super::state::{EngineControlState, EngineParameters};
use super::telemetry::TelemetryQueue;
use crate::control::chains::{motor_in, motor_out, motor_tree};
use crate::control::io::IoVector;
use crate::error::EngineError;

/// Measurement and actuation for a motor engine.
pub struct MotorProfile {
    encoder: Box<dyn Encoder>,
    actuator: Box<dyn ActuatorSink>,
}

impl MotorProfile {
    pub(crate) fn sample(&mut self, state: &mut EngineControlState) {
        let reading = self.encoder.sample();
        state.pose_current = Pose::new(reading.position, 0.0, 0.0);
        state.speed_current = PolarVector::speed(reading.speed, 0.0);
    }

    pub(crate) fn fill_inputs(
        &self,
        state: &EngineControlState,
        speed_mode: bool,
        inputs: &mut IoVector,
    ) {
        inputs.set(motor_in::POSITION, state.pose_current.x());
        inputs.set(motor_in::TARGET, state.pose_target.pose.x());
        inputs.set(motor_in::SPEED, state.speed_current.distance);
        inputs.set(motor_in::LIMIT, state.speed_order.distance.abs());
        inputs.set(motor_in::SPEED_MODE, if speed_mode { 1.0 } else { 0.0 });
        inputs.set(motor_in::ORDER, state.speed_order.distance);
    }

    pub(crate) fn read_outputs(&self, state: &mut EngineControlState, outputs: &IoVector) {
        state.speed_command = PolarVector::speed(outputs.get(motor_out::COMMAND), 0.0);
        state.speed_order_filtered = PolarVector::speed(outputs.get(motor_out::ORDER), 0.0);
    }

    pub(crate) fn apply(&mut self, command: PolarVector) {
        self.actuator.apply(&[command.distance]);
    }

    pub(crate) fn halt(&mut self) {
        self.actuator.apply(&[0.0]);
    }

    pub(crate) fn release(&mut self) {
        self.actuator.disable();
    }

    pub(crate) fn reset_pose(&mut self, pose: Pose) {
        self.encoder.reset_position(pose.x());
    }
}

/// Builder for a motor [`ControllerEngine`].
pub struct MotorEngine {
    config: MotorConfig,
    dt: f64,
    encoder: Box<dyn Encoder>,
    actuator: Box<dyn ActuatorSink>,
    hooks: Box<dyn CycleHooks>,
    telemetry: Option<TelemetryQueue>,
    telemetry_interval: u32,
}

impl fmt::Debug for MotorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotorEngine")
            .field("config", &self.config)
            .field("dt", &self.dt)
            .field("telemetry", &self.telemetry)
            .field("telemetry_interval", &self.telemetry_interval)
            .finish_non_exhaustive()
    }
}

impl MotorEngine {
    pub fn new(
        config: MotorConfig,
        dt: f64,
        encoder: impl Encoder + 'static,
        actuator: impl ActuatorSink + 'static,
    ) -> Self {
        Self {
            config,
            dt,
            encoder: Box::new(encoder),
            actuator: Box::new(actuator),
            hooks: Box::new(NoHooks),
            telemetry: None,
            telemetry_interval: 0,
        }
    }

    pub fn hooks(mut self, hooks: impl CycleHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn telemetry(mut self, queue: TelemetryQueue, interval: u32) -> Self {
        self.telemetry = Some(queue);
        self.telemetry_interval = interval;
        self
    }

    pub fn build(self) -> Result<ControllerEngine, EngineError> {
        self.config.validate()?;
        check_period(self.dt)?;
        let tree = motor_tree(&self.config, self.dt)?;
        let params = EngineParameters {
            dt: self.dt,
            max_linear_speed: self.config.max_speed,
            max_angular_speed: 0.0,
            timeout: self.config.timeout,
            telemetry_interval: self.telemetry_interval,
        };
        // Heading never moves on an axis; only the position tolerance counts.
        let pose_reached = PoseReachedParameters {
            linear_threshold: self.config.position_threshold,
            angular_threshold: 180.0,
            policy: PoseReachedPolicy::Simultaneous,
        };
        Ok(ControllerEngine::new(EngineParts {
            name: self.config.name.clone(),
            tree,
            params,
            blocking: self.config.blocking,
            pose_reached,
            path_follow: false,
            profile: Profile::Motor(MotorProfile {
                encoder: self.encoder,
                actuator: self.actuator,
            }),
            hooks: self.hooks,
            telemetry: self.telemetry,
        }))
    }
}
