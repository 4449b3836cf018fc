//! Configuration loading and engine construction.
//!
//! Reads a [`PilotConfig`] from TOML, validates it as a whole, and hands
//! out engine builders preset with the configured period and sections.

use std::path::Path;

use pilot_common::config::{ConfigError, ConfigLoader};
use pilot_common::motion::PilotConfig;
use tracing::debug;

use crate::engine::{ActuatorSink, Encoder, MotorEngine, Odometer, PlatformEngine};

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<PilotConfig, ConfigError> {
    let config = PilotConfig::load(path)?;
    config.validate()?;
    debug!(
        path = %path.display(),
        cycle_time_us = config.cycle_time_us,
        motors = config.motors.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse and validate a configuration document.
pub fn load_config_from_str(text: &str) -> Result<PilotConfig, ConfigError> {
    let config = PilotConfig::from_toml(text)?;
    config.validate()?;
    Ok(config)
}

/// Platform engine builder for `config`.
pub fn platform_engine(
    config: &PilotConfig,
    odometer: impl Odometer + 'static,
    actuators: impl ActuatorSink + 'static,
) -> PlatformEngine {
    PlatformEngine::new(
        config.platform.clone(),
        config.cycle_time_s(),
        odometer,
        actuators,
    )
}

/// Builder for the motor called `name`.
pub fn motor_engine(
    config: &PilotConfig,
    name: &str,
    encoder: impl Encoder + 'static,
    actuator: impl ActuatorSink + 'static,
) -> Result<MotorEngine, ConfigError> {
    let motor = config
        .motors
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| ConfigError::invalid("motors", format!("no motor named '{name}'")))?;
    Ok(MotorEngine::new(
        motor.clone(),
        config.cycle_time_s(),
        encoder,
        actuator,
    ))
}

// ─── Tests ──────────────────────────────────────────────────────────
