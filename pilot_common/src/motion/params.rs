//! Typed parameter blocks for controllers and engines.
//!
//! Each block is owned by exactly one controller or engine and can be
//! replaced between cycles. All blocks deserialize from TOML with
//! `#[serde(default)]` on optional fields and expose `validate()` with
//! explicit bounds.

use serde::{Deserialize, Serialize};

// ─── PID ────────────────────────────────────────────────────────────

/// PID gains with an integral clamp.
///
/// Zero `ki` disables the integral term, zero `kd` the derivative term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(default)]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    /// Integral accumulator clamp `[-limit, +limit]` (anti-windup).
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f64,
}

fn default_integral_limit() -> f64 {
    f64::MAX
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral_limit: f64::MAX,
        }
    }
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64, integral_limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit,
        }
    }

    /// Pure proportional gains.
    pub const fn proportional(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0, f64::MAX)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !v.is_finite() {
                return Err(format!("{name} must be finite, got {v}"));
            }
        }
        if self.integral_limit.is_nan() || self.integral_limit < 0.0 {
            return Err(format!(
                "integral_limit must be >= 0, got {}",
                self.integral_limit
            ));
        }
        Ok(())
    }
}

// ─── Pose decomposition ─────────────────────────────────────────────

/// Thresholds of the three-step straight-line move (rotate, drive, rotate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseStraightParameters {
    /// Rotate in place while the bearing error exceeds this [deg].
    #[serde(default = "default_angular_threshold")]
    pub angular_threshold: f64,
    /// Position considered reached below this distance [mm].
    #[serde(default = "default_linear_threshold")]
    pub linear_threshold: f64,
    /// Skip the final rotation to the target orientation.
    #[serde(default)]
    pub bypass_final_orientation: bool,
}

fn default_angular_threshold() -> f64 {
    2.0
}

fn default_linear_threshold() -> f64 {
    5.0
}

impl Default for PoseStraightParameters {
    fn default() -> Self {
        Self {
            angular_threshold: default_angular_threshold(),
            linear_threshold: default_linear_threshold(),
            bypass_final_orientation: false,
        }
    }
}

impl PoseStraightParameters {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=180.0).contains(&self.angular_threshold) {
            return Err(format!(
                "angular_threshold {} out of range [0, 180]",
                self.angular_threshold
            ));
        }
        if !(self.linear_threshold >= 0.0 && self.linear_threshold.is_finite()) {
            return Err(format!(
                "linear_threshold must be finite and >= 0, got {}",
                self.linear_threshold
            ));
        }
        Ok(())
    }
}

// ─── Speed ramp ─────────────────────────────────────────────────────

/// Speed-order limits applied before the speed PID.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedFilterParameters {
    /// Non-zero orders below this magnitude are raised to it [unit/s].
    #[serde(default)]
    pub min_speed: f64,
    /// Absolute speed cap [unit/s].
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    /// Maximum change of the order relative to the measured speed [unit/s²].
    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: f64,
}

fn default_max_speed() -> f64 {
    f64::MAX
}

fn default_max_acceleration() -> f64 {
    f64::MAX
}

impl Default for SpeedFilterParameters {
    fn default() -> Self {
        Self {
            min_speed: 0.0,
            max_speed: f64::MAX,
            max_acceleration: f64::MAX,
        }
    }
}

impl SpeedFilterParameters {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_speed.is_nan() || self.min_speed < 0.0 {
            return Err(format!("min_speed must be >= 0, got {}", self.min_speed));
        }
        if self.max_speed.is_nan() || self.max_speed <= 0.0 {
            return Err(format!("max_speed must be > 0, got {}", self.max_speed));
        }
        if self.min_speed > self.max_speed {
            return Err(format!(
                "min_speed {} exceeds max_speed {}",
                self.min_speed, self.max_speed
            ));
        }
        if self.max_acceleration.is_nan() || self.max_acceleration <= 0.0 {
            return Err(format!(
                "max_acceleration must be > 0, got {}",
                self.max_acceleration
            ));
        }
        Ok(())
    }
}

// ─── Engine supervision ─────────────────────────────────────────────

/// Stall detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockingParameters {
    /// Master switch; `false` disables the check entirely.
    #[serde(default = "default_true")]
    pub anti_blocking_on: bool,
    /// Measured speed below this magnitude counts as "not moving" [unit/s].
    #[serde(default)]
    pub speed_threshold: f64,
    /// Order/measure divergence above this counts as "not tracking" [unit/s].
    #[serde(default)]
    pub speed_error_threshold: f64,
    /// Consecutive stalled cycles before entering `Blocked`.
    #[serde(default = "default_blocking_cycles")]
    pub cycles_max: u32,
}

fn default_true() -> bool {
    true
}

fn default_blocking_cycles() -> u32 {
    BLOCKING_CYCLES_DEFAULT
}

/// Default number of consecutive stalled cycles.
pub const BLOCKING_CYCLES_DEFAULT: u32 = 25;

impl Default for BlockingParameters {
    fn default() -> Self {
        Self {
            anti_blocking_on: true,
            speed_threshold: 0.0,
            speed_error_threshold: 0.0,
            cycles_max: BLOCKING_CYCLES_DEFAULT,
        }
    }
}

impl BlockingParameters {
    pub fn validate(&self) -> Result<(), String> {
        if self.cycles_max == 0 {
            return Err("blocking cycles_max must be >= 1".to_string());
        }
        if self.speed_threshold.is_nan() || self.speed_threshold < 0.0 {
            return Err(format!(
                "blocking speed_threshold must be >= 0, got {}",
                self.speed_threshold
            ));
        }
        if self.speed_error_threshold.is_nan() || self.speed_error_threshold < 0.0 {
            return Err(format!(
                "blocking speed_error_threshold must be >= 0, got {}",
                self.speed_error_threshold
            ));
        }
        Ok(())
    }
}

/// How linear and angular tolerances combine into "pose reached".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseReachedPolicy {
    /// Both tolerances must hold in the same cycle.
    #[default]
    Simultaneous,
    /// Position is latched first; orientation is then checked alone.
    Sequential,
}

/// Tolerances for the pose-reached evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseReachedParameters {
    /// [mm]
    #[serde(default = "default_linear_threshold")]
    pub linear_threshold: f64,
    /// [deg]
    #[serde(default = "default_angular_threshold")]
    pub angular_threshold: f64,
    #[serde(default)]
    pub policy: PoseReachedPolicy,
}

impl Default for PoseReachedParameters {
    fn default() -> Self {
        Self {
            linear_threshold: default_linear_threshold(),
            angular_threshold: default_angular_threshold(),
            policy: PoseReachedPolicy::Simultaneous,
        }
    }
}

impl PoseReachedParameters {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.linear_threshold > 0.0 && self.linear_threshold.is_finite()) {
            return Err(format!(
                "pose_reached linear_threshold must be > 0, got {}",
                self.linear_threshold
            ));
        }
        if !(self.angular_threshold > 0.0 && self.angular_threshold <= 180.0) {
            return Err(format!(
                "pose_reached angular_threshold {} out of range (0, 180]",
                self.angular_threshold
            ));
        }
        Ok(())
    }
}

/// Per-command timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutParameters {
    #[serde(default)]
    pub enabled: bool,
    /// Cycles allowed between issuing a command and reaching its target.
    #[serde(default = "default_timeout_cycles")]
    pub timeout_cycle_number: u32,
}

fn default_timeout_cycles() -> u32 {
    TIMEOUT_CYCLES_DEFAULT
}

/// Default timeout (10 s at 20 ms).
pub const TIMEOUT_CYCLES_DEFAULT: u32 = 500;

impl Default for TimeoutParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_cycle_number: TIMEOUT_CYCLES_DEFAULT,
        }
    }
}

impl TimeoutParameters {
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled && self.timeout_cycle_number == 0 {
            return Err("timeout_cycle_number must be >= 1 when enabled".to_string());
        }
        Ok(())
    }
}

// ─── Drive kinematics ───────────────────────────────────────────────

/// Differential-drive geometry and motor scaling.
///
/// Converts a polar speed command into left/right duty percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialDriveParameters {
    /// Distance between the two wheel contact points [mm].
    pub track_width_mm: f64,
    pub left_wheel_diameter_mm: f64,
    pub right_wheel_diameter_mm: f64,
    /// Duty percentage per wheel revolution per second.
    #[serde(default = "default_motor_constant")]
    pub left_motor_constant: f64,
    #[serde(default = "default_motor_constant")]
    pub right_motor_constant: f64,
    /// Non-zero duties below this are raised to it [%].
    #[serde(default)]
    pub min_duty_percent: f64,
    /// Duty saturation [%].
    #[serde(default = "default_max_duty")]
    pub max_duty_percent: f64,
}

fn default_motor_constant() -> f64 {
    30.0
}

fn default_max_duty() -> f64 {
    100.0
}

impl Default for DifferentialDriveParameters {
    fn default() -> Self {
        Self {
            track_width_mm: 250.0,
            left_wheel_diameter_mm: 60.0,
            right_wheel_diameter_mm: 60.0,
            left_motor_constant: default_motor_constant(),
            right_motor_constant: default_motor_constant(),
            min_duty_percent: 0.0,
            max_duty_percent: 100.0,
        }
    }
}

impl DifferentialDriveParameters {
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("track_width_mm", self.track_width_mm),
            ("left_wheel_diameter_mm", self.left_wheel_diameter_mm),
            ("right_wheel_diameter_mm", self.right_wheel_diameter_mm),
            ("left_motor_constant", self.left_motor_constant),
            ("right_motor_constant", self.right_motor_constant),
        ] {
            if !(v > 0.0 && v.is_finite()) {
                return Err(format!("{name} must be > 0, got {v}"));
            }
        }
        if !(0.0..=100.0).contains(&self.max_duty_percent) || self.max_duty_percent == 0.0 {
            return Err(format!(
                "max_duty_percent {} out of range (0, 100]",
                self.max_duty_percent
            ));
        }
        if self.min_duty_percent < 0.0 || self.min_duty_percent > self.max_duty_percent {
            return Err(format!(
                "min_duty_percent {} out of range [0, {}]",
                self.min_duty_percent, self.max_duty_percent
            ));
        }
        Ok(())
    }
}
