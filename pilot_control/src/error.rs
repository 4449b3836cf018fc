//! Error types.
//!
//! Construction-time faults (`WiringError`, `ParameterError`) stop an
//! engine from being built. Control faults at runtime never surface as
//! `Err`: they become mode transitions and status flags.

use pilot_common::config::ConfigError;
use pilot_common::motion::ControlMode;
use thiserror::Error;

use crate::engine::mode::ModeEvent;

/// Controller tree wiring fault, detected while the tree is assembled or
/// validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    #[error("io vector of {requested} exceeds capacity {capacity}")]
    Capacity { requested: usize, capacity: usize },

    #[error("controller '{name}' has invalid arity {inputs} -> {outputs}")]
    InvalidArity {
        name: String,
        inputs: usize,
        outputs: usize,
    },

    #[error(
        "'{child}' takes {found} inputs but '{parent}' feeds it {expected}"
    )]
    StageMismatch {
        parent: String,
        child: String,
        expected: usize,
        found: usize,
    },

    #[error("'{child}' {side} map has {found} entries, expected {expected}")]
    MappingLength {
        child: String,
        side: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("'{child}' {side} index {index} out of range for '{parent}' (len {len})")]
    IndexOutOfRange {
        parent: String,
        child: String,
        side: &'static str,
        index: usize,
        len: usize,
    },

    #[error("output {index} of '{parent}' already claimed by '{owner}'")]
    OutputClaimed {
        parent: String,
        owner: String,
        index: usize,
    },

    #[error("output {index} of '{parent}' is not driven by any child")]
    OutputUnclaimed { parent: String, index: usize },

    #[error("controller '{name}' built with invalid parameters: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("composite controller '{name}' has no children")]
    Empty { name: String },

    #[error("tree '{name}' is {inputs} -> {outputs}, engine expects {expected_inputs} -> {expected_outputs}")]
    EngineShape {
        name: String,
        inputs: usize,
        outputs: usize,
        expected_inputs: usize,
        expected_outputs: usize,
    },
}

/// Rejected `set_parameters` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("no controller named '{0}'")]
    UnknownController(String),

    #[error("controller '{name}' takes {expected} parameters, got {found}")]
    WrongKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("controller '{name}' has no parameters")]
    NotParameterized { name: String },

    #[error("invalid parameters for '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// Engine construction and handle errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wiring(#[from] WiringError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("mode request {event:?} rejected in {mode}: {reason}")]
    TransitionRejected {
        mode: ControlMode,
        event: ModeEvent,
        reason: &'static str,
    },
}

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Cycle took longer than its period (`rt` builds only).
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun { actual_ns: i64, budget_ns: i64 },

    #[error("failed to spawn cycle thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("cycle thread panicked")]
    Panicked,
}

/// Telemetry sink failure. Logged by the publisher, never fatal.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("telemetry encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
