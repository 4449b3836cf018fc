//! Pose-reached evaluation.
//!
//! Final poses need both tolerances; the policy decides whether they must
//! hold in the same cycle or whether the position may be latched first.
//! Intermediate poses only need the linear tolerance.

use pilot_common::geometry::{PathPose, Pose};
use pilot_common::motion::{PoseReachedParameters, PoseReachedPolicy, PoseStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct PoseReachedEvaluator {
    params: PoseReachedParameters,
    position_latched: bool,
}

impl PoseReachedEvaluator {
    pub fn new(params: PoseReachedParameters) -> Self {
        Self {
            params,
            position_latched: false,
        }
    }

    pub fn parameters(&self) -> &PoseReachedParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: PoseReachedParameters) {
        self.params = params;
    }

    /// Position tolerance already met under the sequential policy.
    #[inline]
    pub fn position_latched(&self) -> bool {
        self.position_latched
    }

    /// Forget the latch; called whenever a new target is loaded.
    #[inline]
    pub fn reset(&mut self) {
        self.position_latched = false;
    }

    /// Status of `target` seen from `current`.
    pub fn evaluate(&mut self, current: &Pose, target: &PathPose) -> PoseStatus {
        let linear_ok = current.distance_to(&target.pose) < self.params.linear_threshold;

        if target.intermediate {
            return if linear_ok {
                PoseStatus::IntermediateReached
            } else {
                PoseStatus::Moving
            };
        }

        let angular_ok =
            current.heading_error_to(&target.pose).abs() < self.params.angular_threshold;

        let reached = match self.params.policy {
            PoseReachedPolicy::Simultaneous => linear_ok && angular_ok,
            PoseReachedPolicy::Sequential => {
                self.position_latched |= linear_ok;
                self.position_latched && angular_ok
            }
        };

        if reached {
            PoseStatus::Reached
        } else {
            PoseStatus::Moving
        }
    }
}
