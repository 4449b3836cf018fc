//! Kinematic filters used as leaf laws.
//!
//! Pose decomposition (rotate, drive straight, rotate) and the speed ramp
//! (cap, acceleration limit, minimum-speed lift). Both operate on plain
//! slices so that they can be tested without a controller tree.

use pilot_common::geometry::{Pose, normalize_angle_deg};
use pilot_common::motion::{PoseStraightParameters, SpeedFilterParameters};

// ─── Pose decomposition ─────────────────────────────────────────────

/// Input layout of [`PoseStraightFilter`].
pub mod pose_in {
    pub const CURRENT_X: usize = 0;
    pub const CURRENT_Y: usize = 1;
    pub const CURRENT_O: usize = 2;
    pub const TARGET_X: usize = 3;
    pub const TARGET_Y: usize = 4;
    pub const TARGET_O: usize = 5;
    pub const LINEAR_SPEED: usize = 6;
    pub const ANGULAR_SPEED: usize = 7;
    pub const LINEAR_ORDER: usize = 8;
    pub const ANGULAR_ORDER: usize = 9;
    pub const ALLOW_REVERSE: usize = 10;
    pub const INTERMEDIATE: usize = 11;
    pub const SPEED_MODE: usize = 12;
    pub const LEN: usize = 13;
}

/// Output layout of [`PoseStraightFilter`].
pub mod pose_out {
    pub const LINEAR_ERROR: usize = 0;
    pub const LINEAR_SPEED: usize = 1;
    pub const LINEAR_LIMIT: usize = 2;
    pub const LINEAR_ORDER: usize = 3;
    pub const ANGULAR_ERROR: usize = 4;
    pub const ANGULAR_SPEED: usize = 5;
    pub const ANGULAR_LIMIT: usize = 6;
    pub const ANGULAR_ORDER: usize = 7;
    pub const SPEED_MODE: usize = 8;
    pub const LEN: usize = 9;
}

/// Which of the three move steps the filter is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    /// Far from target, bearing off: rotate in place.
    Align,
    /// Far from target, bearing within threshold: drive.
    Straight,
    /// Within the linear threshold: rotate to final orientation.
    Orient,
    /// Speed mode, no position loop.
    Speed,
}

/// Decomposes a pose error into linear and angular set-points.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseStraightFilter {
    params: PoseStraightParameters,
    /// Target for which the straight step has started. Once aligned, the
    /// robot may reverse to correct an overshoot instead of turning round.
    aligned_on: Option<Pose>,
    step: MoveStep,
}

impl PoseStraightFilter {
    pub fn new(params: PoseStraightParameters) -> Self {
        Self {
            params,
            aligned_on: None,
            step: MoveStep::Speed,
        }
    }

    pub fn parameters(&self) -> &PoseStraightParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: PoseStraightParameters) {
        self.params = params;
    }

    /// Step decided on the last compute.
    pub fn step(&self) -> MoveStep {
        self.step
    }

    pub fn reset(&mut self) {
        self.aligned_on = None;
        self.step = MoveStep::Speed;
    }

    pub fn compute(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        use pose_in as i;
        use pose_out as o;

        let linear_speed = inputs[i::LINEAR_SPEED];
        let angular_speed = inputs[i::ANGULAR_SPEED];
        let linear_order = inputs[i::LINEAR_ORDER];
        let angular_order = inputs[i::ANGULAR_ORDER];
        let speed_mode = inputs[i::SPEED_MODE];

        outputs[o::LINEAR_SPEED] = linear_speed;
        outputs[o::ANGULAR_SPEED] = angular_speed;
        outputs[o::LINEAR_ORDER] = linear_order;
        outputs[o::ANGULAR_ORDER] = angular_order;
        outputs[o::SPEED_MODE] = speed_mode;

        if speed_mode >= 0.5 {
            self.step = MoveStep::Speed;
            self.aligned_on = None;
            outputs[o::LINEAR_ERROR] = 0.0;
            outputs[o::ANGULAR_ERROR] = 0.0;
            outputs[o::LINEAR_LIMIT] = linear_order.abs();
            outputs[o::ANGULAR_LIMIT] = angular_order.abs();
            return;
        }

        let current = Pose::new(
            inputs[i::CURRENT_X],
            inputs[i::CURRENT_Y],
            inputs[i::CURRENT_O],
        );
        let target = Pose::new(inputs[i::TARGET_X], inputs[i::TARGET_Y], inputs[i::TARGET_O]);
        let intermediate = inputs[i::INTERMEDIATE] >= 0.5;

        if self.aligned_on.is_some_and(|p| p != target) {
            self.aligned_on = None;
        }
        let allow_reverse = inputs[i::ALLOW_REVERSE] >= 0.5 || self.aligned_on.is_some();

        let mut error = current.polar_error_to(&target);
        if allow_reverse && error.angle.abs() > 90.0 {
            error.reverse();
        }

        let mut linear_limit = linear_order.abs();
        let angular_limit = angular_order.abs();

        if error.distance.abs() > self.params.linear_threshold {
            if error.angle.abs() > self.params.angular_threshold {
                self.step = MoveStep::Align;
                linear_limit = 0.0;
            } else {
                self.step = MoveStep::Straight;
                self.aligned_on = Some(target);
            }
        } else {
            self.step = MoveStep::Orient;
            error.angle = if intermediate || self.params.bypass_final_orientation {
                0.0
            } else {
                normalize_angle_deg(target.orientation() - current.orientation())
            };
        }

        outputs[o::LINEAR_ERROR] = error.distance;
        outputs[o::LINEAR_LIMIT] = linear_limit;
        outputs[o::ANGULAR_ERROR] = error.angle;
        outputs[o::ANGULAR_LIMIT] = angular_limit;
    }
}

// ─── Speed ramp ─────────────────────────────────────────────────────

/// Shapes a speed order before it reaches the speed loop.
///
/// Inputs `[order, current_speed, limit]`, outputs
/// `[filtered_order, current_speed]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedFilter {
    params: SpeedFilterParameters,
    dt: f64,
}

impl SpeedFilter {
    pub const INPUTS: usize = 3;
    pub const OUTPUTS: usize = 2;

    pub fn new(params: SpeedFilterParameters, dt: f64) -> Self {
        Self { params, dt }
    }

    pub fn parameters(&self) -> &SpeedFilterParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: SpeedFilterParameters) {
        self.params = params;
    }

    /// Filter one order. `limit` is an absolute magnitude.
    pub fn limit_speed_order(&self, order: f64, current: f64, limit: f64) -> f64 {
        let cap = self.params.max_speed.min(limit.abs());
        let mut order = order.clamp(-cap, cap);

        if self.dt > 0.0 {
            let max_step = self.params.max_acceleration * self.dt;
            let step = (order - current).clamp(-max_step, max_step);
            order = current + step;
        }

        let min = self.params.min_speed;
        if order != 0.0 && order.abs() < min {
            order = min.copysign(order);
        }

        order.clamp(-cap, cap)
    }

    pub fn compute(&self, inputs: &[f64], outputs: &mut [f64]) {
        let (order, current, limit) = (inputs[0], inputs[1], inputs[2]);
        outputs[0] = self.limit_speed_order(order, current, limit);
        outputs[1] = current;
    }
}

// ─── Selector / pass-through ────────────────────────────────────────

/// Copy `a` (selector < 0.5) or `b` to `outputs`.
///
/// `inputs` is `[selector, a_0..a_w, b_0..b_w]` with `w = outputs.len()`.
#[inline]
pub fn switch(inputs: &[f64], outputs: &mut [f64]) {
    let width = outputs.len();
    let start = if inputs[0] < 0.5 { 1 } else { 1 + width };
    outputs.copy_from_slice(&inputs[start..start + width]);
}

#[inline]
pub fn passthrough(inputs: &[f64], outputs: &mut [f64]) {
    outputs.copy_from_slice(inputs);
}
