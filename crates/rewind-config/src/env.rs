//! Environment variable overrides.

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{HubConfig, LogFormat, TelemetryConfig};
use crate::validate::parse_capacity_str;

/// Environment variable holding the maximum undo-stack depth.
pub const ENV_UNDO_CAPACITY: &str = "REWIND_UNDO_CAPACITY";
/// Environment variable holding the log level or filter directive.
pub const ENV_LOG_LEVEL: &str = "REWIND_LOG_LEVEL";
/// Environment variable holding the log output format.
pub const ENV_LOG_FORMAT: &str = "REWIND_LOG_FORMAT";

impl HubConfig {
    /// Load hub settings from `REWIND_UNDO_CAPACITY`.
    ///
    /// An unset or blank variable yields an unbounded undo stack.
    ///
    /// # Errors
    ///
    /// Returns an error when the variable is set but is not a non-negative integer.
    pub fn from_env() -> ConfigResult<Self> {
        hub_config_from_value(std::env::var(ENV_UNDO_CAPACITY).ok())
    }
}

impl TelemetryConfig {
    /// Load logging settings from `REWIND_LOG_LEVEL` and `REWIND_LOG_FORMAT`.
    ///
    /// # Errors
    ///
    /// Returns an error when `REWIND_LOG_FORMAT` names an unsupported format.
    pub fn from_env() -> ConfigResult<Self> {
        telemetry_config_from_values(
            std::env::var(ENV_LOG_LEVEL).ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
        )
    }
}

fn hub_config_from_value(raw: Option<String>) -> ConfigResult<HubConfig> {
    let Some(raw) = raw else {
        return Ok(HubConfig::unbounded());
    };

    let undo_capacity = parse_capacity_str(&raw).map_err(|message| ConfigError::InvalidEnv {
        variable: ENV_UNDO_CAPACITY,
        message,
    })?;
    debug!(
        variable = ENV_UNDO_CAPACITY,
        capacity = undo_capacity.map_or(0, std::num::NonZeroUsize::get),
        "loaded undo capacity from environment"
    );
    Ok(HubConfig { undo_capacity })
}

fn telemetry_config_from_values(
    level: Option<String>,
    format: Option<String>,
) -> ConfigResult<TelemetryConfig> {
    let mut config = TelemetryConfig::default();

    if let Some(level) = level.filter(|value| !value.trim().is_empty()) {
        config.level = level.trim().to_string();
    }
    if let Some(format) = format.filter(|value| !value.trim().is_empty()) {
        config.format = format
            .parse::<LogFormat>()
            .map_err(|err| ConfigError::InvalidEnv {
                variable: ENV_LOG_FORMAT,
                message: err.to_string(),
            })?;
    }

    Ok(config)
}
