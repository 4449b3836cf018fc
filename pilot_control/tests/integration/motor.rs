//! Motor engine on a simulated axis.

use pilot_common::geometry::PolarVector;
use pilot_common::motion::{ControlMode, MotorConfig, PilotConfig, PoseStatus};
use pilot_control::config::motor_engine;
use pilot_control::engine::MotorEngine;
use pilot_control::sim::SimulatedAxis;

use super::*;

fn axis(config: MotorConfig) -> (EngineHandle, SimulatedAxis) {
    let axis = SimulatedAxis::new(DT);
    let engine = MotorEngine::new(config, DT, axis.encoder(), axis.actuator())
        .build()
        .unwrap();
    let handle = EngineHandle::new(engine);
    handle.enable().unwrap();
    (handle, axis)
}

#[test]
fn motor_engine_named_after_config() {
    let (handle, _axis) = axis(MotorConfig::new("lift"));
    assert_eq!(handle.name(), "lift");
    assert_eq!(handle.mode(), ControlMode::Idle);
}

#[test]
fn motor_reaches_position() {
    let (handle, axis) = axis(MotorConfig::new("lift"));
    handle.set_pose_target(target(100.0, 0.0, 0.0)).unwrap();

    let cycles = run_until(&handle, 300, EngineHandle::pose_reached);
    assert!(cycles.is_some(), "not reached, at {}", axis.position());
    assert!((axis.position() - 100.0).abs() < 1.0);
    assert_eq!(handle.pose_status(), PoseStatus::Reached);
    assert_eq!(handle.mode(), ControlMode::Running);
}

#[test]
fn motor_speed_never_exceeds_max() {
    let (handle, axis) = axis(MotorConfig {
        max_speed: 50.0,
        ..MotorConfig::new("lift")
    });
    handle.set_pose_target(target(1000.0, 0.0, 0.0)).unwrap();

    let mut peak: f64 = 0.0;
    for _ in 0..200 {
        handle.step();
        peak = peak.max(handle.state().speed_order_filtered.distance.abs());
    }
    assert!(peak <= 50.0 + 1e-9, "peak order {peak}");
    assert!(axis.position() > 0.0);
}

#[test]
fn motor_speed_target_converges() {
    let (handle, axis) = axis(MotorConfig::new("lift"));
    handle
        .set_speed_target(PolarVector::speed(40.0, 0.0))
        .unwrap();
    for _ in 0..100 {
        handle.step();
    }
    assert!((axis.commanded() - 40.0).abs() < 0.5);
    assert_eq!(handle.mode(), ControlMode::RunningSpeed);
}

#[test]
fn motor_position_reset_through_encoder() {
    let (handle, axis) = axis(MotorConfig::new("lift"));
    handle.set_pose_current(Pose::new(250.0, 0.0, 0.0));
    assert_eq!(axis.position(), 250.0);

    handle.step();
    assert_eq!(handle.pose_current().x(), 250.0);
}

#[test]
fn motor_builder_from_config_by_name() {
    let config = PilotConfig {
        motors: vec![MotorConfig::new("lift"), MotorConfig::new("gripper")],
        ..Default::default()
    };
    let sim = SimulatedAxis::new(config.cycle_time_s());

    let engine = motor_engine(&config, "gripper", sim.encoder(), sim.actuator())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(engine.name(), "gripper");

    let err = motor_engine(&config, "winch", sim.encoder(), sim.actuator()).unwrap_err();
    assert!(err.to_string().contains("winch"));
}

#[test]
fn disabled_motor_releases_actuator() {
    let (handle, axis) = axis(MotorConfig::new("lift"));
    handle.set_pose_target(target(100.0, 0.0, 0.0)).unwrap();
    for _ in 0..5 {
        handle.step();
    }
    assert!(axis.is_enabled());
    handle.disable();
    assert!(!axis.is_enabled());
    assert_eq!(axis.commanded(), 0.0);
}
