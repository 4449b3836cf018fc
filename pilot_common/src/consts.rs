//! System-wide constants for the pilot workspace.
//!
//! Single source of truth for numeric limits and default paths.

/// Default control cycle in microseconds (50 Hz).
pub const DEFAULT_CYCLE_TIME_US: u32 = 20_000;

/// Shortest accepted control cycle [µs].
pub const MIN_CYCLE_TIME_US: u32 = 100;

/// Longest accepted control cycle [µs].
pub const MAX_CYCLE_TIME_US: u32 = 1_000_000;

/// Capacity of every controller input/output vector.
pub const MAX_CONTROLLER_IO: usize = 32;

/// Maximum number of motor engines in one process.
pub const MAX_MOTORS: usize = 8;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pilot/pilot.toml";
