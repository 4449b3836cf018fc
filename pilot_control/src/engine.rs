//! Periodic controller engines.
//!
//! A [`ControllerEngine`] runs one controller tree on a fixed period with
//! a run-mode machine, stall detection, pose-reached evaluation and a
//! command timeout. [`PlatformEngine`] and [`MotorEngine`] build the two
//! standard kinds; [`EngineHandle`] shares one across threads.

pub mod blocking;
pub mod collaborators;
pub mod controller;
pub mod drive;
pub mod handle;
pub mod hooks;
pub mod mode;
pub mod motor;
pub mod platform;
pub mod reached;
pub mod state;
pub mod telemetry;

pub use blocking::BlockingDetector;
pub use collaborators::{
    ActuatorSink, Encoder, EncoderReading, Odometer, Odometry, TargetSource, TelemetrySink,
};
pub use controller::ControllerEngine;
pub use drive::DifferentialDrive;
pub use handle::EngineHandle;
pub use hooks::{CycleHooks, NoHooks};
pub use mode::{ModeEvent, ModeMachine, ModeTransition};
pub use motor::MotorEngine;
pub use platform::PlatformEngine;
pub use reached::PoseReachedEvaluator;
pub use state::{EngineControlState, EngineParameters};
pub use telemetry::{
    JsonLinesTelemetry, LogTelemetry, TELEMETRY_QUEUE_DEPTH, TelemetryPublisher, TelemetryQueue,
    TelemetrySnapshot, TelemetryWorker,
};
