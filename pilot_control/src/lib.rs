//! # Pilot Control Library
//!
//! Motion control for a mobile robot: composable controller trees (PID
//! loops, pose decomposition, speed ramps) executed on a fixed period by
//! engines with an explicit run-mode machine and stall detection.
//!
//! ## Layers
//!
//! 1. **control**: leaves, sequential and parallel composites, standard
//!    platform and motor trees
//! 2. **engine**: `ControllerEngine` cycle, mode machine, blocking and
//!    pose-reached detection, differential drive, telemetry
//! 3. **cycle**: one periodic thread per engine, optional RT setup
//! 4. **config** / **sim**: engines from TOML, simulated collaborators
//!
//! ## Allocation
//!
//! Trees are wired once at startup. Controller I/O lives in fixed-capacity
//! vectors; `compute()` performs no allocation and no I/O.

#![deny(clippy::disallowed_types)]

pub mod config;
pub mod control;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod sim;
