//! Engines cycled by their own thread.

use std::thread;
use std::time::{Duration, Instant};

use pilot_common::motion::{ControlMode, PoseStatus};
use pilot_control::cycle::{CycleConfig, EngineTask};

use super::*;

fn fast(max_cycles: Option<u64>) -> CycleConfig {
    CycleConfig {
        cycle_time_us: 1000,
        max_cycles,
        ..Default::default()
    }
}

#[test]
fn task_runs_its_cycle_budget() {
    let (handle, _base) = platform(platform_config());
    let task = EngineTask::spawn(handle.clone(), fast(Some(50))).unwrap();
    let stats = task.join().unwrap();

    assert_eq!(stats.cycle_count, 50);
    assert_eq!(handle.current_cycle(), 50);
    assert!(stats.min_cycle_ns <= stats.max_cycle_ns);
}

#[test]
fn commands_from_another_thread_reach_the_task() {
    let (handle, base) = platform(platform_config());
    let task = EngineTask::spawn(handle.clone(), fast(None)).unwrap();

    handle.set_pose_target(target(200.0, 0.0, 0.0)).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while handle.pose_status() != PoseStatus::Reached && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    task.stop();
    let stats = task.join().unwrap();

    assert_eq!(handle.pose_status(), PoseStatus::Reached);
    assert!(base.pose().distance_to(&Pose::new(200.0, 0.0, 0.0)) < 5.0);
    assert!(stats.cycle_count > 0);
}

#[test]
fn stop_flag_ends_the_task() {
    let (handle, _base) = platform(platform_config());
    let task = EngineTask::spawn(handle.clone(), fast(None)).unwrap();
    thread::sleep(Duration::from_millis(20));
    assert!(!task.is_finished());

    task.stop_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let stats = task.join().unwrap();
    assert!(stats.cycle_count > 0);

    let cycle = handle.current_cycle();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(handle.current_cycle(), cycle);
    assert_eq!(handle.mode(), ControlMode::Idle);
}

#[test]
fn dropping_the_task_stops_it() {
    let (handle, _base) = platform(platform_config());
    {
        let _task = EngineTask::spawn(handle.clone(), fast(None)).unwrap();
        thread::sleep(Duration::from_millis(10));
    }
    let cycle = handle.current_cycle();
    thread::sleep(Duration::from_millis(10));
    assert_eq!(handle.current_cycle(), cycle);
}
