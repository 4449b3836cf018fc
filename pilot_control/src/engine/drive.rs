//! Differential-drive kinematics.
//!
//! Positive angular speed turns counter-clockwise: the right wheel runs
//! faster than the left.

use std::f64::consts::PI;

use pilot_common::geometry::PolarVector;
use pilot_common::motion::DifferentialDriveParameters;

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;
/// Actuators driven by a differential base.
pub const WHEELS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    params: DifferentialDriveParameters,
}

impl DifferentialDrive {
    pub fn new(params: DifferentialDriveParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &DifferentialDriveParameters {
        &self.params
    }

    /// Wheel surface speeds [mm/s] for a polar speed (linear mm/s,
    /// angular deg/s).
    pub fn wheel_speeds(&self, speed: PolarVector) -> [f64; WHEELS] {
        let half_turn = speed.angle.to_radians() * self.params.track_width_mm / 2.0;
        [speed.distance - half_turn, speed.distance + half_turn]
    }

    /// Duty percentages for a polar speed, saturated and dead-band lifted.
    pub fn duties(&self, speed: PolarVector) -> [f64; WHEELS] {
        let [left, right] = self.wheel_speeds(speed);
        [
            self.shape_duty(
                left / (PI * self.params.left_wheel_diameter_mm) * self.params.left_motor_constant,
            ),
            self.shape_duty(
                right / (PI * self.params.right_wheel_diameter_mm)
                    * self.params.right_motor_constant,
            ),
        ]
    }

    /// Polar speed produced by a pair of duties, ignoring saturation.
    pub fn speed_from_duties(&self, duties: [f64; WHEELS]) -> PolarVector {
        let left = duties[LEFT] / self.params.left_motor_constant
            * PI
            * self.params.left_wheel_diameter_mm;
        let right = duties[RIGHT] / self.params.right_motor_constant
            * PI
            * self.params.right_wheel_diameter_mm;
        PolarVector::speed(
            (left + right) / 2.0,
            ((right - left) / self.params.track_width_mm).to_degrees(),
        )
    }

    fn shape_duty(&self, duty: f64) -> f64 {
        let max = self.params.max_duty_percent;
        let min = self.params.min_duty_percent;
        if duty == 0.0 || !duty.is_finite() {
            return 0.0;
        }
        let magnitude = duty.abs().clamp(min, max);
        magnitude.copysign(duty)
    }
}
