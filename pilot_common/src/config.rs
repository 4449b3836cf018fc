//! TOML configuration plumbing shared by pilot crates.
//!
//! A pilot reads one TOML document. The `[shared]` table names the
//! service and its log level; every other table belongs to the motion
//! configuration in [`crate::motion`]. Loading and validation are separate
//! steps: [`ConfigLoader`] only reads and parses, each parameter block then
//! checks itself and reports failures through [`ConfigError::invalid`] with
//! the dotted path of the offending table.
//!
//! ```rust,no_run
//! use pilot_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct BaseConfig {
//!     shared: SharedConfig,
//!     cycle_time_us: u32,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = BaseConfig::load(Path::new("pilot.toml"))?;
//!     config.shared.validate()?;
//!     println!("{} at {} us", config.shared.service_name, config.cycle_time_us);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    FileNotFound,

    /// The file exists but could not be read.
    #[error("Failed to read configuration: {0}")]
    Read(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A parameter block rejected its values.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Validation failure in `section` (dotted table path, e.g.
    /// `platform.blocking`).
    pub fn invalid(section: &str, msg: impl std::fmt::Display) -> Self {
        Self::ValidationError(format!("{section}: {msg}"))
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound,
            _ => Self::Read(e.to_string()),
        }
    }
}

/// Default verbosity of the pilot's `tracing` subscriber. `RUST_LOG`
/// overrides it at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-cycle engine traces.
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// The `[shared]` table.
///
/// ```toml
/// [shared]
/// service_name = "pilot-base-01"
/// log_level = "debug"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance name; tags log lines and telemetry.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "pilot".to_string(),
        }
    }
}

impl SharedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::invalid("shared", "service_name cannot be empty"));
        }
        Ok(())
    }
}

/// Read and parse a TOML document into any deserializable type.
///
/// A missing file is [`ConfigError::FileNotFound`]; any other I/O failure
/// is [`ConfigError::Read`]; bad syntax or shape is
/// [`ConfigError::ParseError`]. Nothing here validates values.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
