//! Reaching pose targets and the hooks that observe it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pilot_common::motion::{
    ControlMode, PlatformConfig, PoseReachedParameters, PoseReachedPolicy, PoseStatus,
};
use pilot_common::geometry::PolarVector;
use pilot_control::engine::{
    ActuatorSink, CycleHooks, EngineControlState, Odometer, Odometry, PlatformEngine,
};

use super::*;

#[derive(Clone, Default)]
struct Counters {
    pre: Arc<AtomicUsize>,
    post: Arc<AtomicUsize>,
    reached: Arc<AtomicUsize>,
}

impl CycleHooks for Counters {
    fn pre_mode(&mut self, _state: &mut EngineControlState) {
        self.pre.fetch_add(1, Ordering::Relaxed);
    }

    fn post_mode(&mut self, _state: &mut EngineControlState) {
        self.post.fetch_add(1, Ordering::Relaxed);
    }

    fn pose_reached(&mut self, state: &EngineControlState) {
        assert!(state.pose_reached);
        self.reached.fetch_add(1, Ordering::Relaxed);
    }
}

fn hooked(config: PlatformConfig, hooks: Counters) -> (EngineHandle, SimulatedBase) {
    let base = SimulatedBase::new(config.drive, DT);
    let engine = PlatformEngine::new(config, DT, base.odometer(), base.actuators())
        .hooks(hooks)
        .build()
        .unwrap();
    let handle = EngineHandle::new(engine);
    handle.enable().unwrap();
    (handle, base)
}

/// Odometry that closes a fixed distance along +x every sample,
/// whatever the engine commands.
struct ScriptedOdometer {
    step_mm: f64,
    pose: Pose,
}

impl Odometer for ScriptedOdometer {
    fn sample(&mut self) -> Odometry {
        self.pose = Pose::new(self.pose.x() + self.step_mm, 0.0, 0.0);
        Odometry {
            pose: self.pose,
            speed: PolarVector::speed(self.step_mm / DT, 0.0),
        }
    }

    fn reset_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }
}

struct NullActuators;

impl ActuatorSink for NullActuators {
    fn apply(&mut self, _commands: &[f64]) {}

    fn disable(&mut self) {}
}

#[test]
fn reached_on_first_cycle_inside_thresholds() {
    let counters = Counters::default();
    let config = PlatformConfig {
        pose_reached: PoseReachedParameters {
            linear_threshold: 5.0,
            angular_threshold: 2.0,
            policy: PoseReachedPolicy::Simultaneous,
        },
        ..platform_config()
    };
    let odometer = ScriptedOdometer {
        step_mm: 7.0,
        pose: Pose::new(0.0, 0.0, 0.0),
    };
    let engine = PlatformEngine::new(config, DT, odometer, NullActuators)
        .hooks(counters.clone())
        .build()
        .unwrap();
    let handle = EngineHandle::new(engine);
    handle.enable().unwrap();
    handle.set_pose_target(target(100.0, 0.0, 0.0)).unwrap();

    // x = 7 mm per cycle: 91 mm is 9 mm out, 98 mm is the first sample
    // strictly inside 5 mm.
    let cycles = run_until(&handle, 100, EngineHandle::pose_reached);
    assert_eq!(cycles, Some(14));
    assert_eq!(handle.pose_current().x(), 98.0);
    assert_eq!(handle.pose_status(), PoseStatus::Reached);
    assert_eq!(counters.reached.load(Ordering::Relaxed), 1);

    // Overshooting past the tolerance leaves the flag latched.
    for _ in 0..10 {
        handle.step();
        assert!(handle.pose_reached());
    }
    assert!(handle.pose_current().x() > 105.0);
    assert_eq!(counters.reached.load(Ordering::Relaxed), 1);
}

#[test]
fn straight_target_reached() {
    let (handle, base) = platform(platform_config());
    handle.set_pose_target(target(200.0, 0.0, 0.0)).unwrap();

    let cycles = run_until(&handle, 500, EngineHandle::pose_reached);
    assert!(cycles.is_some(), "stopped at {:?}", base.pose());

    let state = handle.state();
    assert_eq!(state.pose_status, PoseStatus::Reached);
    assert!(!state.pose_intermediate);
    assert_eq!(state.mode, ControlMode::Running);
    assert!(base.pose().distance_to(&Pose::new(200.0, 0.0, 0.0)) < 5.0);
}

#[test]
fn target_behind_reached_after_turning() {
    let (handle, base) = platform(platform_config());
    handle.set_pose_target(target(0.0, 200.0, 90.0)).unwrap();

    let cycles = run_until(&handle, 2000, EngineHandle::pose_reached);
    assert!(cycles.is_some(), "stopped at {:?}", base.pose());
    let pose = base.pose();
    assert!(pose.distance_to(&Pose::new(0.0, 200.0, 90.0)) < 5.0);
    assert!((pose.orientation() - 90.0).abs() < 2.0);
}

#[test]
fn hooks_run_every_cycle_and_reached_once() {
    let counters = Counters::default();
    let (handle, _base) = hooked(platform_config(), counters.clone());
    handle.set_pose_target(target(200.0, 0.0, 0.0)).unwrap();

    run_until(&handle, 500, EngineHandle::pose_reached).unwrap();
    for _ in 0..100 {
        handle.step();
    }

    let cycles = handle.current_cycle() as usize;
    assert_eq!(counters.pre.load(Ordering::Relaxed), cycles);
    assert_eq!(counters.post.load(Ordering::Relaxed), cycles);
    assert_eq!(counters.reached.load(Ordering::Relaxed), 1);
}

#[test]
fn new_target_clears_reached_flags() {
    let counters = Counters::default();
    let (handle, _base) = hooked(platform_config(), counters.clone());
    handle.set_pose_target(target(200.0, 0.0, 0.0)).unwrap();
    run_until(&handle, 500, EngineHandle::pose_reached).unwrap();

    handle.set_pose_target(target(400.0, 0.0, 0.0)).unwrap();
    let state = handle.state();
    assert!(!state.pose_reached);
    assert_eq!(state.pose_status, PoseStatus::Moving);

    run_until(&handle, 500, EngineHandle::pose_reached).unwrap();
    assert_eq!(counters.reached.load(Ordering::Relaxed), 2);
}

#[test]
fn intermediate_target_needs_only_position() {
    let (handle, _base) = platform(platform_config());
    handle
        .set_pose_target(target(200.0, 0.0, 120.0).with_intermediate(true))
        .unwrap();

    run_until(&handle, 500, EngineHandle::pose_reached).unwrap();
    let state = handle.state();
    assert_eq!(state.pose_status, PoseStatus::IntermediateReached);
    assert!(state.pose_intermediate);
}

#[test]
fn sequential_policy_latches_position() {
    let (handle, base) = platform(PlatformConfig {
        pose_reached: PoseReachedParameters {
            policy: PoseReachedPolicy::Sequential,
            ..Default::default()
        },
        ..platform_config()
    });
    assert_eq!(
        handle.with_engine(|e| e.pose_reached_parameters().policy),
        PoseReachedPolicy::Sequential
    );
    handle.set_pose_target(target(200.0, 0.0, 45.0)).unwrap();

    run_until(&handle, 2000, EngineHandle::pose_reached).unwrap();
    assert_eq!(handle.pose_status(), PoseStatus::Reached);
    assert!((base.pose().orientation() - 45.0).abs() < 2.0);
}

#[test]
fn pose_reset_moves_the_measurement() {
    let (handle, base) = platform(platform_config());
    handle.set_pose_current(Pose::new(1000.0, -250.0, 30.0));
    assert_eq!(base.pose(), Pose::new(1000.0, -250.0, 30.0));

    handle.step();
    assert_eq!(handle.pose_current(), Pose::new(1000.0, -250.0, 30.0));
}
