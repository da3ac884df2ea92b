//! Logging initialisation primitives.
//!
//! # Design
//! - Centralises logging setup (fmt or JSON) with a single entry point.
//! - `RUST_LOG` wins over the configured level so operators can widen filters.
//! - Records the service name once so repeated initialisation is detectable.

use once_cell::sync::OnceCell;
use rewind_config::{DEFAULT_LOG_LEVEL, LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

static SERVICE_NAME: OnceCell<String> = OnceCell::new();

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level or filter directive (e.g., `info`, `rewind_hub=debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Logical service name recorded on the startup log line.
    pub service_name: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            service_name: "rewind",
        }
    }
}

impl<'a> From<&'a TelemetryConfig> for LoggingConfig<'a> {
    fn from(config: &'a TelemetryConfig) -> Self {
        Self {
            level: &config.level,
            format: config.format,
            ..Self::default()
        }
    }
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    install_fmt_subscriber(config)?;
    SERVICE_NAME.set(config.service_name.to_string()).ok();
    tracing::info!(
        service = config.service_name,
        format = %config.format,
        "logging initialised"
    );
    Ok(())
}

/// Whether [`init_logging`] has completed successfully in this process.
#[must_use]
pub fn is_initialised() -> bool {
    SERVICE_NAME.get().is_some()
}

fn install_fmt_subscriber(config: &LoggingConfig<'_>) -> Result<()> {
    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
            .map_err(|source| TelemetryError::SubscriberInstall { source }),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()
            .map_err(|source| TelemetryError::SubscriberInstall { source }),
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn logging_config_borrows_from_telemetry_config() {
        let telemetry = TelemetryConfig::from_json(&json!({
            "log_level": "debug",
            "log_format": "json"
        }))
        .expect("telemetry config");
        let config = LoggingConfig::from(&telemetry);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.service_name, "rewind");
    }

    #[test]
    fn invalid_level_falls_back_to_default_filter() {
        let filter = build_env_filter("[[not a directive");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn init_logging_installs_subscriber_once() {
        let config = LoggingConfig {
            level: "info",
            format: LogFormat::Pretty,
            service_name: "rewind-telemetry-tests",
        };
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
