//! Mode requests, command timeouts and parameter updates through the handle.

use pilot_common::geometry::PolarVector;
use pilot_common::motion::{
    ControlMode, PidGains, PlatformConfig, PoseStatus, SpeedFilterParameters, TimeoutParameters,
};
use pilot_control::control::LeafParameters;
use pilot_control::control::chains::names;
use pilot_control::engine::{DifferentialDrive, ModeEvent, PlatformEngine};
use pilot_control::error::{EngineError, ParameterError};

use super::*;

#[test]
fn new_engine_starts_stopped() {
    let base = SimulatedBase::new(platform_config().drive, DT);
    let engine = PlatformEngine::new(platform_config(), DT, base.odometer(), base.actuators())
        .build()
        .unwrap();
    assert_eq!(engine.mode(), ControlMode::Stop);
    assert_eq!(engine.name(), "platform");
    assert_eq!(engine.state().current_cycle, 0);
}

#[test]
fn running_cannot_be_requested_from_stop() {
    let base = SimulatedBase::new(platform_config().drive, DT);
    let handle = EngineHandle::new(
        PlatformEngine::new(platform_config(), DT, base.odometer(), base.actuators())
            .build()
            .unwrap(),
    );

    let err = handle.request_mode(ControlMode::Running).unwrap_err();
    assert!(matches!(
        err,
        EngineError::TransitionRejected {
            mode: ControlMode::Stop,
            event: ModeEvent::PoseTarget,
            ..
        }
    ));
    assert_eq!(handle.mode(), ControlMode::Stop);

    handle.request_mode(ControlMode::Idle).unwrap();
    assert_eq!(handle.mode(), ControlMode::Idle);
}

#[test]
fn idle_holds_zero_command() {
    let (handle, base) = platform(platform_config());
    for _ in 0..10 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::Idle);
    assert_eq!(handle.state().speed_command, PolarVector::zero());
    assert_eq!(base.duties(), [0.0, 0.0]);
    assert_eq!(base.pose(), Pose::default());
}

#[test]
fn stop_releases_actuators() {
    let (handle, base) = platform(platform_config());
    handle.set_pose_target(target(500.0, 0.0, 0.0)).unwrap();
    for _ in 0..10 {
        handle.step();
    }
    assert!(base.is_enabled());

    handle.disable();
    assert_eq!(handle.mode(), ControlMode::Stop);
    assert!(!base.is_enabled());

    handle.step();
    assert_eq!(handle.state().speed_command, PolarVector::zero());
    assert!(!base.is_enabled());
}

#[test]
fn release_returns_to_idle_and_halts() {
    let (handle, base) = platform(platform_config());
    handle.set_pose_target(target(500.0, 0.0, 0.0)).unwrap();
    for _ in 0..10 {
        handle.step();
    }
    handle.release().unwrap();
    assert_eq!(handle.mode(), ControlMode::Idle);
    assert_eq!(base.duties(), [0.0, 0.0]);
}

#[test]
fn passthrough_forwards_order_to_the_wheels() {
    let config = platform_config();
    let drive = DifferentialDrive::new(config.drive);
    let (handle, base) = platform(config);

    let order = PolarVector::speed(120.0, 30.0);
    handle.set_passthrough(order).unwrap();
    handle.step();
    assert_eq!(handle.mode(), ControlMode::Passthrough);
    assert_eq!(handle.state().speed_command, order);
    assert_eq!(base.duties(), drive.duties(order));

    let faster = PolarVector::speed(200.0, 0.0);
    handle.set_speed_order(faster);
    handle.step();
    assert_eq!(handle.mode(), ControlMode::Passthrough);
    assert_eq!(base.duties(), drive.duties(faster));
}

#[test]
fn passthrough_not_reachable_while_running() {
    let (handle, _base) = platform(platform_config());
    handle.set_pose_target(target(500.0, 0.0, 0.0)).unwrap();
    let err = handle
        .set_passthrough(PolarVector::speed(10.0, 0.0))
        .unwrap_err();
    assert!(matches!(err, EngineError::TransitionRejected { .. }));
    assert_eq!(handle.mode(), ControlMode::Running);
}

#[test]
fn speed_target_tracks_order() {
    let (handle, base) = platform(platform_config());
    handle
        .set_speed_target(PolarVector::speed(150.0, 0.0))
        .unwrap();
    assert_eq!(handle.mode(), ControlMode::RunningSpeed);

    for _ in 0..100 {
        handle.step();
    }
    assert!((base.speed().distance - 150.0).abs() < 1.0);
    assert!(base.speed().angle.abs() < 1e-6);
    assert_eq!(handle.mode(), ControlMode::RunningSpeed);
}

#[test]
fn pose_target_times_out_into_idle() {
    let (handle, base) = platform(PlatformConfig {
        timeout: TimeoutParameters {
            enabled: true,
            timeout_cycle_number: 20,
        },
        ..platform_config()
    });
    handle.set_pose_target(target(5000.0, 0.0, 0.0)).unwrap();

    for _ in 0..20 {
        handle.step();
        assert_eq!(handle.mode(), ControlMode::Running);
    }
    handle.step();
    assert_eq!(handle.mode(), ControlMode::Idle);
    assert_eq!(handle.pose_status(), PoseStatus::Timeout);
    assert_eq!(base.duties(), [0.0, 0.0]);
}

#[test]
fn new_command_restarts_the_timeout() {
    let (handle, _base) = platform(platform_config());
    handle
        .set_timeout_parameters(TimeoutParameters {
            enabled: true,
            timeout_cycle_number: 20,
        })
        .unwrap();
    handle.set_pose_target(target(5000.0, 0.0, 0.0)).unwrap();
    for _ in 0..15 {
        handle.step();
    }
    handle.set_pose_target(target(6000.0, 0.0, 0.0)).unwrap();
    for _ in 0..15 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::Running);
    assert_eq!(handle.state().cycles_since_command(), 15);
}

#[test]
fn controller_parameters_routed_to_named_leaf() {
    let (handle, _base) = platform(platform_config());
    let gains = PidGains::proportional(1.5);
    handle
        .set_controller_parameters(names::LINEAR_POSITION_PID, LeafParameters::Pid(gains))
        .unwrap();
    assert_eq!(
        handle.controller_parameters(names::LINEAR_POSITION_PID),
        Some(LeafParameters::Pid(gains))
    );

    let err = handle
        .set_controller_parameters(
            names::LINEAR_POSITION_PID,
            LeafParameters::SpeedRamp(SpeedFilterParameters::default()),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Parameter(ParameterError::WrongKind { .. })
    ));

    let err = handle
        .set_controller_parameters("steering", LeafParameters::Pid(gains))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Parameter(ParameterError::UnknownController(_))
    ));
}
