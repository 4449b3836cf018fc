//! Thread-safe access to a running engine.
//!
//! The cycle thread holds the lock for the whole cycle body, so every
//! accessor here takes effect at a cycle boundary.

use std::sync::Arc;

use parking_lot::Mutex;
use pilot_common::geometry::{PathPose, PolarVector, Pose};
use pilot_common::motion::{
    BlockingParameters, ControlMode, PoseReachedParameters, PoseStatus, TimeoutParameters,
};

use super::controller::ControllerEngine;
use super::state::EngineControlState;
use crate::control::leaf::LeafParameters;
use crate::error::EngineError;

/// Cloneable handle to a shared [`ControllerEngine`].
#[derive(Clone, Debug)]
pub struct EngineHandle {
    inner: Arc<Mutex<ControllerEngine>>,
}

impl EngineHandle {
    pub fn new(engine: ControllerEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run one cycle under the lock.
    pub fn step(&self) {
        self.inner.lock().step();
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut ControllerEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn name(&self) -> String {
        self.inner.lock().name().to_string()
    }

    pub fn mode(&self) -> ControlMode {
        self.inner.lock().mode()
    }

    /// Copy of the control state.
    pub fn state(&self) -> EngineControlState {
        self.inner.lock().state().clone()
    }

    pub fn pose_current(&self) -> Pose {
        self.inner.lock().state().pose_current
    }

    pub fn pose_status(&self) -> PoseStatus {
        self.inner.lock().state().pose_status
    }

    pub fn pose_reached(&self) -> bool {
        self.inner.lock().state().pose_reached
    }

    pub fn current_cycle(&self) -> u64 {
        self.inner.lock().state().current_cycle
    }

    pub fn set_pose_current(&self, pose: Pose) {
        self.inner.lock().set_pose_current(pose);
    }

    pub fn set_speed_order(&self, order: PolarVector) {
        self.inner.lock().set_speed_order(order);
    }

    pub fn set_pose_target(&self, target: PathPose) -> Result<(), EngineError> {
        self.inner.lock().set_pose_target(target)
    }

    pub fn set_speed_target(&self, order: PolarVector) -> Result<(), EngineError> {
        self.inner.lock().set_speed_target(order)
    }

    pub fn set_passthrough(&self, order: PolarVector) -> Result<(), EngineError> {
        self.inner.lock().set_passthrough(order)
    }

    pub fn request_mode(&self, mode: ControlMode) -> Result<(), EngineError> {
        self.inner.lock().request_mode(mode)
    }

    pub fn enable(&self) -> Result<(), EngineError> {
        self.inner.lock().enable()
    }

    pub fn disable(&self) {
        self.inner.lock().disable();
    }

    pub fn release(&self) -> Result<(), EngineError> {
        self.inner.lock().release()
    }

    pub fn recover(&self) -> Result<(), EngineError> {
        self.inner.lock().recover()
    }

    pub fn set_path_follow(&self, enabled: bool) {
        self.inner.lock().set_path_follow(enabled);
    }

    pub fn set_controller_parameters(
        &self,
        name: &str,
        params: LeafParameters,
    ) -> Result<(), EngineError> {
        self.inner.lock().set_controller_parameters(name, params)
    }

    pub fn controller_parameters(&self, name: &str) -> Option<LeafParameters> {
        self.inner.lock().controller_parameters(name)
    }

    pub fn set_blocking_parameters(&self, params: BlockingParameters) -> Result<(), EngineError> {
        self.inner.lock().set_blocking_parameters(params)
    }

    pub fn set_pose_reached_parameters(
        &self,
        params: PoseReachedParameters,
    ) -> Result<(), EngineError> {
        self.inner.lock().set_pose_reached_parameters(params)
    }

    pub fn set_timeout_parameters(&self, params: TimeoutParameters) -> Result<(), EngineError> {
        self.inner.lock().set_timeout_parameters(params)
    }

    /// Indented dump of the controller tree.
    pub fn tree_dump(&self) -> String {
        self.inner.lock().tree().to_string()
    }
}
