//! Motion-control shared types: run modes, controller parameter blocks and
//! engine configuration.

pub mod config;
pub mod mode;
pub mod params;

pub use config::{MotorConfig, PilotConfig, PlatformConfig};
pub use mode::{ControlMode, PoseStatus};
pub use params::{
    BlockingParameters, DifferentialDriveParameters, PidGains, PoseReachedParameters,
    PoseReachedPolicy, PoseStraightParameters, SpeedFilterParameters, TimeoutParameters,
};
