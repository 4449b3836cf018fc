//! Per-cycle extension points.

use super::state::EngineControlState;

/// Callbacks run synchronously inside the cycle, with the engine lock held.
///
/// Hooks must not block; they run at the cycle rate.
pub trait CycleHooks: Send {
    /// After measurements are sampled, before the tree computes.
    fn pre_mode(&mut self, _state: &mut EngineControlState) {}

    /// After actuator commands are issued.
    fn post_mode(&mut self, _state: &mut EngineControlState) {}

    /// Once per target, on the cycle it is first reached.
    fn pose_reached(&mut self, _state: &EngineControlState) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl CycleHooks for NoHooks {}
