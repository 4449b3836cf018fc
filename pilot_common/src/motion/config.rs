//! Engine configuration loaded from TOML.
//!
//! One `PilotConfig` per process: shared fields, the cycle period, the
//! platform engine and zero or more motor engines. Immutable once the
//! engines are built; runtime retuning goes through the engine handle.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_CYCLE_TIME_US, MAX_MOTORS, MIN_CYCLE_TIME_US};

use super::params::{
    BlockingParameters, DifferentialDriveParameters, PidGains, PoseReachedParameters,
    PoseStraightParameters, SpeedFilterParameters, TimeoutParameters,
};

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level pilot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotConfig {
    #[serde(default)]
    pub shared: SharedConfig,

    /// Control period in microseconds (default: 20000 = 50 Hz).
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Publish a telemetry snapshot every N cycles; 0 disables.
    #[serde(default = "default_telemetry_interval")]
    pub telemetry_interval: u32,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub motors: Vec<MotorConfig>,
}

fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

fn default_telemetry_interval() -> u32 {
    50
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            telemetry_interval: default_telemetry_interval(),
            platform: PlatformConfig::default(),
            motors: Vec::new(),
        }
    }
}

impl PilotConfig {
    /// Cycle period in seconds, the `dt` handed to every controller.
    #[inline]
    pub fn cycle_time_s(&self) -> f64 {
        f64::from(self.cycle_time_us) * 1e-6
    }

    /// Validate every block, reporting the first failure with its path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.cycle_time_us < MIN_CYCLE_TIME_US || self.cycle_time_us > MAX_CYCLE_TIME_US {
            return Err(ConfigError::invalid(
                "cycle_time_us",
                format!(
                    "{} out of range [{}, {}]",
                    self.cycle_time_us, MIN_CYCLE_TIME_US, MAX_CYCLE_TIME_US
                ),
            ));
        }
        self.platform.validate()?;
        if self.motors.len() > MAX_MOTORS {
            return Err(ConfigError::invalid(
                "motors",
                format!("{} motors configured, at most {}", self.motors.len(), MAX_MOTORS),
            ));
        }
        for (i, motor) in self.motors.iter().enumerate() {
            if self.motors[..i].iter().any(|m| m.name == motor.name) {
                return Err(ConfigError::invalid(
                    "motors",
                    format!("duplicate motor name '{}'", motor.name),
                ));
            }
            motor.validate()?;
        }
        Ok(())
    }
}

// ─── Platform ───────────────────────────────────────────────────────

/// Platform (whole vehicle) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// [mm/s]
    #[serde(default = "default_max_linear_speed")]
    pub max_linear_speed: f64,
    /// [deg/s]
    #[serde(default = "default_max_angular_speed")]
    pub max_angular_speed: f64,

    /// Load the next waypoint automatically once the current one is reached.
    #[serde(default = "default_true")]
    pub path_follow: bool,

    #[serde(default = "default_linear_position_pid")]
    pub linear_position_pid: PidGains,
    #[serde(default = "default_angular_position_pid")]
    pub angular_position_pid: PidGains,
    #[serde(default = "default_speed_pid")]
    pub linear_speed_pid: PidGains,
    #[serde(default = "default_speed_pid")]
    pub angular_speed_pid: PidGains,

    #[serde(default)]
    pub pose_straight: PoseStraightParameters,
    #[serde(default)]
    pub linear_speed_filter: SpeedFilterParameters,
    #[serde(default)]
    pub angular_speed_filter: SpeedFilterParameters,

    #[serde(default)]
    pub blocking: BlockingParameters,
    #[serde(default)]
    pub pose_reached: PoseReachedParameters,
    #[serde(default)]
    pub timeout: TimeoutParameters,

    #[serde(default)]
    pub drive: DifferentialDriveParameters,
}

fn default_max_linear_speed() -> f64 {
    500.0
}

fn default_max_angular_speed() -> f64 {
    180.0
}

fn default_true() -> bool {
    true
}

fn default_linear_position_pid() -> PidGains {
    PidGains::proportional(2.0)
}

fn default_angular_position_pid() -> PidGains {
    PidGains::proportional(3.0)
}

/// Velocity-form speed loop: integral only, so the command settles on the
/// order without steady-state error.
fn default_speed_pid() -> PidGains {
    PidGains::new(0.0, 25.0, 0.0, f64::MAX)
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            max_linear_speed: default_max_linear_speed(),
            max_angular_speed: default_max_angular_speed(),
            path_follow: true,
            linear_position_pid: default_linear_position_pid(),
            angular_position_pid: default_angular_position_pid(),
            linear_speed_pid: default_speed_pid(),
            angular_speed_pid: default_speed_pid(),
            pose_straight: PoseStraightParameters::default(),
            linear_speed_filter: SpeedFilterParameters::default(),
            angular_speed_filter: SpeedFilterParameters::default(),
            blocking: BlockingParameters::default(),
            pose_reached: PoseReachedParameters::default(),
            timeout: TimeoutParameters::default(),
            drive: DifferentialDriveParameters::default(),
        }
    }
}

impl PlatformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [
            ("max_linear_speed", self.max_linear_speed),
            ("max_angular_speed", self.max_angular_speed),
        ] {
            if !(v > 0.0 && v.is_finite()) {
                return Err(ConfigError::invalid(
                    "platform",
                    format!("{name} must be > 0, got {v}"),
                ));
            }
        }
        let section = |name: &str| format!("platform.{name}");
        self.linear_position_pid
            .validate()
            .map_err(|e| ConfigError::invalid(&section("linear_position_pid"), e))?;
        self.angular_position_pid
            .validate()
            .map_err(|e| ConfigError::invalid(&section("angular_position_pid"), e))?;
        self.linear_speed_pid
            .validate()
            .map_err(|e| ConfigError::invalid(&section("linear_speed_pid"), e))?;
        self.angular_speed_pid
            .validate()
            .map_err(|e| ConfigError::invalid(&section("angular_speed_pid"), e))?;
        self.pose_straight
            .validate()
            .map_err(|e| ConfigError::invalid(&section("pose_straight"), e))?;
        self.linear_speed_filter
            .validate()
            .map_err(|e| ConfigError::invalid(&section("linear_speed_filter"), e))?;
        self.angular_speed_filter
            .validate()
            .map_err(|e| ConfigError::invalid(&section("angular_speed_filter"), e))?;
        self.blocking
            .validate()
            .map_err(|e| ConfigError::invalid(&section("blocking"), e))?;
        self.pose_reached
            .validate()
            .map_err(|e| ConfigError::invalid(&section("pose_reached"), e))?;
        self.timeout
            .validate()
            .map_err(|e| ConfigError::invalid(&section("timeout"), e))?;
        self.drive
            .validate()
            .map_err(|e| ConfigError::invalid(&section("drive"), e))?;
        Ok(())
    }
}

// ─── Motor ──────────────────────────────────────────────────────────

/// Single-actuator engine configuration (position + speed cascade).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Unique motor identifier.
    pub name: String,

    /// [unit/s]
    #[serde(default = "default_motor_max_speed")]
    pub max_speed: f64,

    /// Target considered reached below this position error [unit].
    #[serde(default = "default_position_threshold")]
    pub position_threshold: f64,

    #[serde(default = "default_motor_position_pid")]
    pub position_pid: PidGains,
    #[serde(default = "default_speed_pid")]
    pub speed_pid: PidGains,
    #[serde(default)]
    pub speed_filter: SpeedFilterParameters,

    #[serde(default)]
    pub blocking: BlockingParameters,
    #[serde(default)]
    pub timeout: TimeoutParameters,
}

fn default_motor_max_speed() -> f64 {
    100.0
}

fn default_position_threshold() -> f64 {
    1.0
}

fn default_motor_position_pid() -> PidGains {
    PidGains::proportional(5.0)
}

impl MotorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_speed: default_motor_max_speed(),
            position_threshold: default_position_threshold(),
            position_pid: default_motor_position_pid(),
            speed_pid: default_speed_pid(),
            speed_filter: SpeedFilterParameters::default(),
            blocking: BlockingParameters::default(),
            timeout: TimeoutParameters::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let section = |name: &str| format!("motors.{}.{name}", self.name);
        if self.name.is_empty() {
            return Err(ConfigError::invalid("motors", "name cannot be empty"));
        }
        if !(self.max_speed > 0.0 && self.max_speed.is_finite()) {
            return Err(ConfigError::invalid(
                &section("max_speed"),
                format!("must be > 0, got {}", self.max_speed),
            ));
        }
        if !(self.position_threshold > 0.0 && self.position_threshold.is_finite()) {
            return Err(ConfigError::invalid(
                &section("position_threshold"),
                format!("must be > 0, got {}", self.position_threshold),
            ));
        }
        self.position_pid
            .validate()
            .map_err(|e| ConfigError::invalid(&section("position_pid"), e))?;
        self.speed_pid
            .validate()
            .map_err(|e| ConfigError::invalid(&section("speed_pid"), e))?;
        self.speed_filter
            .validate()
            .map_err(|e| ConfigError::invalid(&section("speed_filter"), e))?;
        self.blocking
            .validate()
            .map_err(|e| ConfigError::invalid(&section("blocking"), e))?;
        self.timeout
            .validate()
            .map_err(|e| ConfigError::invalid(&section("timeout"), e))?;
        Ok(())
    }
}
