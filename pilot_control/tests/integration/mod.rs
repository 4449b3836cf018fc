//! Shared fixtures for the integration suites.

mod blocking;
mod composition;
mod mode_transitions;
mod motor;
mod path_following;
mod pose_reached;
mod task;
mod telemetry;

use pilot_common::geometry::{PathPose, Pose};
use pilot_common::motion::PlatformConfig;
use pilot_control::engine::{EngineHandle, PlatformEngine};
use pilot_control::sim::SimulatedBase;

pub const DT: f64 = 0.02;

/// Default platform without path following.
pub fn platform_config() -> PlatformConfig {
    PlatformConfig {
        path_follow: false,
        ..Default::default()
    }
}

/// Enabled platform engine on a fresh simulated base.
pub fn platform(config: PlatformConfig) -> (EngineHandle, SimulatedBase) {
    let base = SimulatedBase::new(config.drive, DT);
    let engine = PlatformEngine::new(config, DT, base.odometer(), base.actuators())
        .build()
        .expect("platform engine should build");
    let handle = EngineHandle::new(engine);
    handle.enable().expect("Stop -> Idle");
    (handle, base)
}

pub fn target(x: f64, y: f64, orientation: f64) -> PathPose {
    PathPose::new(Pose::new(x, y, orientation))
}

/// Step until `done` holds; returns the number of cycles taken.
pub fn run_until(
    handle: &EngineHandle,
    max_cycles: u64,
    mut done: impl FnMut(&EngineHandle) -> bool,
) -> Option<u64> {
    for n in 1..=max_cycles {
        handle.step();
        if done(handle) {
            return Some(n);
        }
    }
    None
}
