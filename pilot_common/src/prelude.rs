//! Prelude module for common re-exports.
//!
//! ```rust
//! use pilot_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::motion::{MotorConfig, PilotConfig, PlatformConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_CONTROLLER_IO};

// ─── Geometry ───────────────────────────────────────────────────────
pub use crate::geometry::{PathPose, PolarVector, Pose, normalize_angle_deg};

// ─── Motion ─────────────────────────────────────────────────────────
pub use crate::motion::{
    BlockingParameters, ControlMode, DifferentialDriveParameters, PidGains,
    PoseReachedParameters, PoseReachedPolicy, PoseStatus, PoseStraightParameters,
    SpeedFilterParameters, TimeoutParameters,
};

/// Default control cycle as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(DEFAULT_CYCLE_TIME_US as u64);
