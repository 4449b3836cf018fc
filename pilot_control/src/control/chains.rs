//! Standard controller trees for the platform and motor engines.
//!
//! Both trees end in the same per-axis tail: pick the position-loop output
//! or the raw order depending on the speed-mode flag, ramp it, then close
//! the speed loop.
//!
//! ```text
//! platform (13 -> 4)
//!   pose_straight (13 -> 9)
//!   axes (9 -> 4)
//!     linear  (5 -> 2)   in [0,1,2,8,3] out [0,2]
//!     angular (5 -> 2)   in [4,5,6,8,7] out [1,3]
//!
//! axis chain (5 -> 2): [error, speed, limit, speed_mode, order]
//!   position stage (5 -> 5)  -> [mode, pid, order, speed, limit]
//!   select stage   (5 -> 3)  -> [speed_order, speed, limit]
//!   speed ramp     (3 -> 2)  -> [filtered, speed]
//!   speed stage    (2 -> 2)  -> [command, filtered]
//! ```

use pilot_common::motion::{MotorConfig, PidGains, PlatformConfig, SpeedFilterParameters};

use super::leaf::{LeafController, PidLayout};
use super::meta::MetaController;
use super::parallel::ParallelMetaController;
use super::tree::Controller;
use crate::error::WiringError;

/// Platform tree inputs.
pub mod platform_in {
    pub use crate::control::filters::pose_in::*;
}

/// Platform tree outputs.
pub mod platform_out {
    pub const LINEAR_COMMAND: usize = 0;
    pub const ANGULAR_COMMAND: usize = 1;
    pub const LINEAR_ORDER: usize = 2;
    pub const ANGULAR_ORDER: usize = 3;
    pub const LEN: usize = 4;
}

/// Motor tree inputs.
pub mod motor_in {
    pub const POSITION: usize = 0;
    pub const TARGET: usize = 1;
    pub const SPEED: usize = 2;
    pub const LIMIT: usize = 3;
    pub const SPEED_MODE: usize = 4;
    pub const ORDER: usize = 5;
    pub const LEN: usize = 6;
}

/// Motor tree outputs.
pub mod motor_out {
    pub const COMMAND: usize = 0;
    pub const ORDER: usize = 1;
    pub const LEN: usize = 2;
}

/// Leaf names reachable through `set_controller_parameters`.
pub mod names {
    pub const POSE_STRAIGHT: &str = "pose_straight";
    pub const LINEAR_POSITION_PID: &str = "linear_position_pid";
    pub const ANGULAR_POSITION_PID: &str = "angular_position_pid";
    pub const LINEAR_SPEED_PID: &str = "linear_speed_pid";
    pub const ANGULAR_SPEED_PID: &str = "angular_speed_pid";
    pub const LINEAR_SPEED_RAMP: &str = "linear_speed_ramp";
    pub const ANGULAR_SPEED_RAMP: &str = "angular_speed_ramp";
    pub const POSITION_PID: &str = "position_pid";
    pub const SPEED_PID: &str = "speed_pid";
    pub const SPEED_RAMP: &str = "speed_ramp";
}

/// Stages after the position loop, shared by every axis.
fn push_speed_tail(
    chain: &mut MetaController,
    prefix: &str,
    speed_pid: PidGains,
    ramp: SpeedFilterParameters,
    dt: f64,
) -> Result<(), WiringError> {
    let mut select = ParallelMetaController::new(format!("{prefix}select"), 5, 3)?;
    select.add_controller(
        LeafController::switch(format!("{prefix}mode_switch"), 1)?,
        &[0, 1, 2],
        &[0],
    )?;
    select.add_controller(
        LeafController::passthrough(format!("{prefix}select_bypass"), 2)?,
        &[3, 4],
        &[1, 2],
    )?;
    chain.add_controller(select)?;

    chain.add_controller(LeafController::speed_ramp(format!("{prefix}speed_ramp"), ramp, dt)?)?;

    let mut speed = ParallelMetaController::new(format!("{prefix}speed"), 2, 2)?;
    speed.add_controller(
        LeafController::pid(
            format!("{prefix}speed_pid"),
            1,
            PidLayout::SetpointMeasurement,
            speed_pid,
            dt,
        )?,
        &[0, 1],
        &[0],
    )?;
    speed.add_controller(
        LeafController::passthrough(format!("{prefix}speed_bypass"), 1)?,
        &[0],
        &[1],
    )?;
    chain.add_controller(speed)?;
    Ok(())
}

/// Position + speed cascade for one platform axis, fed a pre-computed error.
///
/// `prefix` is prepended to every node name (`"linear_"`, `"angular_"`).
pub fn axis_chain(
    prefix: &str,
    position_pid: PidGains,
    speed_pid: PidGains,
    ramp: SpeedFilterParameters,
    dt: f64,
) -> Result<MetaController, WiringError> {
    let mut chain = MetaController::new(prefix.trim_end_matches('_'));

    let mut position = ParallelMetaController::new(format!("{prefix}position"), 5, 5)?;
    position.add_controller(
        LeafController::pid(
            format!("{prefix}position_pid"),
            1,
            PidLayout::Error,
            position_pid,
            dt,
        )?,
        &[0],
        &[1],
    )?;
    position.add_controller(
        LeafController::passthrough(format!("{prefix}position_bypass"), 4)?,
        &[3, 4, 1, 2],
        &[0, 2, 3, 4],
    )?;
    chain.add_controller(position)?;

    push_speed_tail(&mut chain, prefix, speed_pid, ramp, dt)?;
    Ok(chain)
}

/// Full platform tree: pose decomposition then both axes in parallel.
pub fn platform_tree(cfg: &PlatformConfig, dt: f64) -> Result<Controller, WiringError> {
    let mut root = MetaController::new("platform");
    root.add_controller(LeafController::pose_straight(
        names::POSE_STRAIGHT,
        cfg.pose_straight,
    )?)?;

    let mut axes = ParallelMetaController::new("axes", 9, platform_out::LEN)?;
    axes.add_controller(
        axis_chain(
            "linear_",
            cfg.linear_position_pid,
            cfg.linear_speed_pid,
            cfg.linear_speed_filter,
            dt,
        )?,
        &[0, 1, 2, 8, 3],
        &[platform_out::LINEAR_COMMAND, platform_out::LINEAR_ORDER],
    )?;
    axes.add_controller(
        axis_chain(
            "angular_",
            cfg.angular_position_pid,
            cfg.angular_speed_pid,
            cfg.angular_speed_filter,
            dt,
        )?,
        &[4, 5, 6, 8, 7],
        &[platform_out::ANGULAR_COMMAND, platform_out::ANGULAR_ORDER],
    )?;
    root.add_controller(axes)?;

    let tree = Controller::from(root);
    tree.validate()?;
    Ok(tree)
}

/// Motor tree: position loop on `[target, position]`, then the speed tail.
pub fn motor_tree(cfg: &MotorConfig, dt: f64) -> Result<Controller, WiringError> {
    let mut root = MetaController::new(cfg.name.clone());

    let mut position = ParallelMetaController::new("position", motor_in::LEN, 5)?;
    position.add_controller(
        LeafController::pid(
            names::POSITION_PID,
            1,
            PidLayout::SetpointMeasurement,
            cfg.position_pid,
            dt,
        )?,
        &[motor_in::TARGET, motor_in::POSITION],
        &[1],
    )?;
    position.add_controller(
        LeafController::passthrough("position_bypass", 4)?,
        &[
            motor_in::SPEED_MODE,
            motor_in::ORDER,
            motor_in::SPEED,
            motor_in::LIMIT,
        ],
        &[0, 2, 3, 4],
    )?;
    root.add_controller(position)?;

    push_speed_tail(&mut root, "", cfg.speed_pid, cfg.speed_filter, dt)?;

    let tree = Controller::from(root);
    tree.validate()?;
    Ok(tree)
}
