//! Stall detection on a base whose wheels stop turning.

use pilot_common::geometry::{PolarVector, Pose};
use pilot_common::motion::{BlockingParameters, ControlMode, PlatformConfig, PoseStatus};

use super::*;

fn blocking(anti_blocking_on: bool) -> BlockingParameters {
    BlockingParameters {
        anti_blocking_on,
        speed_threshold: 5.0,
        speed_error_threshold: 50.0,
        cycles_max: 10,
    }
}

fn moving_then_blocked(params: BlockingParameters) -> (EngineHandle, SimulatedBase) {
    let (handle, base) = platform(PlatformConfig {
        blocking: params,
        ..platform_config()
    });
    handle.set_pose_target(target(1000.0, 0.0, 0.0)).unwrap();
    for _ in 0..20 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::Running);
    assert!(base.pose().x() > 0.0);
    base.set_blocked(true);
    (handle, base)
}

#[test]
fn blocked_after_exactly_cycles_max() {
    let (handle, _base) = moving_then_blocked(blocking(true));

    for k in 1..10 {
        handle.step();
        assert_eq!(handle.mode(), ControlMode::Running, "tripped at {k}");
        assert_eq!(handle.state().blocking_cycles, k);
    }

    handle.step();
    let state = handle.state();
    assert_eq!(state.mode, ControlMode::Blocked);
    assert_eq!(state.pose_status, PoseStatus::Blocked);
    assert_eq!(state.blocking_cycles, 10);
}

#[test]
fn lowering_cycles_max_mid_stall_blocks_next_cycle() {
    let (handle, _base) = moving_then_blocked(blocking(true));
    for _ in 0..5 {
        handle.step();
    }
    assert_eq!(handle.state().blocking_cycles, 5);

    handle
        .set_blocking_parameters(BlockingParameters {
            cycles_max: 3,
            ..blocking(true)
        })
        .unwrap();
    handle.step();
    let state = handle.state();
    assert_eq!(state.mode, ControlMode::Blocked);
    assert_eq!(state.blocking_cycles, 6);
}

#[test]
fn blocked_engine_halts_wheels() {
    let (handle, base) = moving_then_blocked(blocking(true));
    run_until(&handle, 20, |h| h.mode() == ControlMode::Blocked).unwrap();

    handle.step();
    assert_eq!(base.duties(), [0.0, 0.0]);
    assert!(base.is_enabled());
    assert_eq!(handle.state().speed_command.distance, 0.0);
}

#[test]
fn recover_resumes_the_command() {
    let (handle, base) = moving_then_blocked(blocking(true));
    run_until(&handle, 20, |h| h.mode() == ControlMode::Blocked).unwrap();

    base.set_blocked(false);
    handle.recover().unwrap();
    assert_eq!(handle.mode(), ControlMode::Running);
    assert_eq!(handle.state().blocking_cycles, 0);

    let x = base.pose().x();
    for _ in 0..20 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::Running);
    assert!(base.pose().x() > x);
}

#[test]
fn recover_from_speed_stall_resumes_speed_regulation() {
    let (handle, base) = platform(PlatformConfig {
        blocking: blocking(true),
        ..platform_config()
    });
    handle.set_pose_current(Pose::new(500.0, 0.0, 0.0));
    handle.set_speed_target(PolarVector::speed(200.0, 0.0)).unwrap();
    for _ in 0..20 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::RunningSpeed);
    base.set_blocked(true);
    run_until(&handle, 50, |h| h.mode() == ControlMode::Blocked).unwrap();

    base.set_blocked(false);
    handle.recover().unwrap();
    assert_eq!(handle.mode(), ControlMode::RunningSpeed);
    assert_eq!(handle.state().speed_order.distance, 200.0);

    let x = base.pose().x();
    for _ in 0..100 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::RunningSpeed);
    assert!(base.pose().x() > x + 100.0);
}

#[test]
fn disabled_detection_never_blocks() {
    let (handle, _base) = moving_then_blocked(blocking(false));
    for _ in 0..100 {
        handle.step();
    }
    let state = handle.state();
    assert_eq!(state.mode, ControlMode::Running);
    assert_eq!(state.blocking_cycles, 0);
}

#[test]
fn detection_can_be_switched_on_at_runtime() {
    let (handle, _base) = moving_then_blocked(blocking(false));
    handle.set_blocking_parameters(blocking(true)).unwrap();
    let cycles = run_until(&handle, 50, |h| h.mode() == ControlMode::Blocked);
    assert_eq!(cycles, Some(10));
}

#[test]
fn invalid_blocking_parameters_rejected() {
    let (handle, _base) = platform(platform_config());
    let err = handle
        .set_blocking_parameters(BlockingParameters {
            cycles_max: 0,
            ..blocking(true)
        })
        .unwrap_err();
    assert!(err.to_string().contains("cycles_max"));
}
