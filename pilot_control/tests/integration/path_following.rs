//! Platform engine pulling its targets from a waypoint queue.

use pilot_common::motion::{ControlMode, PlatformConfig, PoseStatus};
use pilot_control::engine::PlatformEngine;
use pilot_control::sim::WaypointQueue;

use super::*;

fn following(path: &WaypointQueue) -> (EngineHandle, SimulatedBase) {
    let config = PlatformConfig {
        path_follow: true,
        ..platform_config()
    };
    let base = SimulatedBase::new(config.drive, DT);
    let engine = PlatformEngine::new(config, DT, base.odometer(), base.actuators())
        .target_source(path.clone())
        .build()
        .unwrap();
    let handle = EngineHandle::new(engine);
    handle.enable().unwrap();
    (handle, base)
}

#[test]
fn first_waypoint_loaded_on_first_cycle() {
    let path = WaypointQueue::path([Pose::new(300.0, 0.0, 0.0), Pose::new(300.0, 300.0, 90.0)]);
    let (handle, _base) = following(&path);
    assert_eq!(handle.mode(), ControlMode::Idle);

    handle.step();
    let state = handle.state();
    assert_eq!(state.mode, ControlMode::Running);
    assert_eq!(state.pose_target.pose, Pose::new(300.0, 0.0, 0.0));
    assert!(state.pose_target.intermediate);
    assert_eq!(path.len(), 2);
}

#[test]
fn path_runs_to_the_final_pose() {
    let path = WaypointQueue::path([Pose::new(300.0, 0.0, 0.0), Pose::new(300.0, 300.0, 90.0)]);
    let (handle, base) = following(&path);

    let mut saw_intermediate = false;
    let cycles = run_until(&handle, 3000, |h| {
        saw_intermediate |= h.pose_status() == PoseStatus::IntermediateReached;
        path.len() == 1 && h.pose_status() == PoseStatus::Reached
    });
    assert!(cycles.is_some(), "stopped at {:?}", base.pose());
    assert!(saw_intermediate);

    let pose = base.pose();
    let goal = Pose::new(300.0, 300.0, 90.0);
    assert!(pose.distance_to(&goal) < 5.0, "final pose {pose:?}");
    assert!((pose.orientation() - 90.0).abs() < 2.0);

    // The reached final pose is consumed; the engine keeps holding it.
    handle.step();
    assert!(path.is_empty());
    assert_eq!(handle.mode(), ControlMode::Running);
    assert_eq!(handle.pose_status(), PoseStatus::Reached);
}

#[test]
fn held_queue_stays_on_current_waypoint() {
    let path = WaypointQueue::path([Pose::new(200.0, 0.0, 0.0), Pose::new(400.0, 0.0, 0.0)]);
    path.set_hold(true);
    let (handle, _base) = following(&path);

    run_until(&handle, 1000, EngineHandle::pose_reached).unwrap();
    for _ in 0..50 {
        handle.step();
    }
    assert_eq!(path.len(), 2);
    assert_eq!(handle.state().pose_target.pose, Pose::new(200.0, 0.0, 0.0));

    path.set_hold(false);
    handle.step();
    handle.step();
    assert_eq!(path.len(), 1);
    assert_eq!(handle.state().pose_target.pose, Pose::new(400.0, 0.0, 0.0));
    assert!(!handle.pose_reached());
}

#[test]
fn waypoints_pushed_after_start_are_picked_up() {
    let path = WaypointQueue::new();
    let (handle, _base) = following(&path);
    for _ in 0..5 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::Idle);

    path.push(target(150.0, 0.0, 0.0));
    handle.step();
    assert_eq!(handle.mode(), ControlMode::Running);
    assert_eq!(handle.state().pose_target.pose, Pose::new(150.0, 0.0, 0.0));
}

#[test]
fn path_following_can_be_switched_off() {
    let path = WaypointQueue::path([Pose::new(300.0, 0.0, 0.0)]);
    let (handle, _base) = following(&path);
    handle.set_path_follow(false);
    for _ in 0..10 {
        handle.step();
    }
    assert_eq!(handle.mode(), ControlMode::Idle);
    assert_eq!(path.len(), 1);
}
