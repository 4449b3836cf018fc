//! Engine run modes and target status enums.
//!
//! Both enums are `#[repr(u8)]` so they fit the fixed-layout telemetry
//! record without conversion.

use serde::{Deserialize, Serialize};

/// Engine operating mode.
///
/// `Stop` is the initial mode and is reachable from every mode. Only
/// `Running` and `RunningSpeed` can fall into `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ControlMode {
    /// Engine disabled, actuators released.
    Stop = 0,
    /// Enabled, holding zero command, waiting for a target.
    Idle = 1,
    /// Stall detected; waiting for recovery or stop.
    Blocked = 2,
    /// Closed loop on a pose target.
    Running = 3,
    /// Closed loop on a speed order only.
    RunningSpeed = 4,
    /// Speed order forwarded to the actuators without regulation.
    Passthrough = 5,
}

impl ControlMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stop),
            1 => Some(Self::Idle),
            2 => Some(Self::Blocked),
            3 => Some(Self::Running),
            4 => Some(Self::RunningSpeed),
            5 => Some(Self::Passthrough),
            _ => None,
        }
    }

    /// Modes in which the controller tree is computed.
    #[inline]
    pub const fn is_regulating(self) -> bool {
        matches!(self, Self::Running | Self::RunningSpeed)
    }

    /// Modes in which the actuators receive a non-zero command.
    #[inline]
    pub const fn drives_actuators(self) -> bool {
        matches!(self, Self::Running | Self::RunningSpeed | Self::Passthrough)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::Idle => "IDLE",
            Self::Blocked => "BLOCKED",
            Self::Running => "RUNNING",
            Self::RunningSpeed => "RUNNING_SPEED",
            Self::Passthrough => "PASSTHROUGH",
        }
    }
}

impl Default for ControlMode {
    fn default() -> Self {
        Self::Stop
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of the active target as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PoseStatus {
    /// Target not reached yet (or no target).
    Moving = 0,
    /// A waypoint that is not the final pose has been reached.
    IntermediateReached = 1,
    /// Final pose reached within both tolerances.
    Reached = 2,
    /// Command aborted by stall detection.
    Blocked = 3,
    /// Command aborted by the per-command timeout.
    Timeout = 4,
}

impl PoseStatus {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Moving),
            1 => Some(Self::IntermediateReached),
            2 => Some(Self::Reached),
            3 => Some(Self::Blocked),
            4 => Some(Self::Timeout),
            _ => None,
        }
    }

    /// True for both final and intermediate arrival.
    #[inline]
    pub const fn is_reached(self) -> bool {
        matches!(self, Self::Reached | Self::IntermediateReached)
    }

    /// True when the command ended without reaching its target.
    #[inline]
    pub const fn is_aborted(self) -> bool {
        matches!(self, Self::Blocked | Self::Timeout)
    }
}

impl Default for PoseStatus {
    fn default() -> Self {
        Self::Moving
    }
}
