//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers consumed by the hub and telemetry crates.
//! - Parsing from JSON documents lives here; field-level checks live in `validate.rs`.

use std::fmt::{self, Display, Formatter};
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::validate::{
    as_section, ensure_known_fields, parse_capacity, parse_log_format, parse_log_level,
};

/// Default log level when neither configuration nor `RUST_LOG` provide one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const HUB_SECTION: &str = "hub";
const HUB_FIELDS: &[&str] = &["undo_capacity"];
const TELEMETRY_SECTION: &str = "telemetry";
const TELEMETRY_FIELDS: &[&str] = &["log_level", "log_format"];

/// Settings applied when a hub is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Maximum undo-stack depth; `None` keeps every message undoable.
    pub undo_capacity: Option<NonZeroUsize>,
}

impl HubConfig {
    /// Configuration with an unbounded undo stack.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            undo_capacity: None,
        }
    }

    /// Configuration with the given undo depth; `0` means unbounded.
    #[must_use]
    pub const fn with_undo_capacity(capacity: usize) -> Self {
        Self {
            undo_capacity: NonZeroUsize::new(capacity),
        }
    }

    /// Parse a `{"undo_capacity": <integer | null>}` document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not an object, contains unknown
    /// fields, or carries a capacity that is not a non-negative integer.
    pub fn from_json(value: &Value) -> ConfigResult<Self> {
        let map = as_section(value, HUB_SECTION)?;
        ensure_known_fields(map, HUB_SECTION, HUB_FIELDS)?;

        let undo_capacity = match map.get("undo_capacity") {
            Some(raw) => parse_capacity(raw, HUB_SECTION, "undo_capacity")?,
            None => None,
        };

        Ok(Self { undo_capacity })
    }

    /// Undo depth as a plain number, `0` meaning unbounded.
    #[must_use]
    pub fn undo_capacity_or_zero(self) -> usize {
        self.undo_capacity.map_or(0, NonZeroUsize::get)
    }
}

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable, pretty-printed logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Lowercase name used in configuration documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::UnknownVariant {
                kind: "log format",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Logging settings consumed by `rewind-telemetry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter directive (e.g. `info`, `rewind_hub=debug`).
    pub level: String,
    /// Output format selection.
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::infer(),
        }
    }
}

impl TelemetryConfig {
    /// Parse a `{"log_level": "...", "log_format": "json|pretty"}` document.
    ///
    /// Missing fields fall back to [`TelemetryConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error when the document is not an object, contains unknown
    /// fields, or carries values of the wrong type.
    pub fn from_json(value: &Value) -> ConfigResult<Self> {
        let map = as_section(value, TELEMETRY_SECTION)?;
        ensure_known_fields(map, TELEMETRY_SECTION, TELEMETRY_FIELDS)?;

        let mut config = Self::default();
        if let Some(raw) = map.get("log_level") {
            config.level = parse_log_level(raw, TELEMETRY_SECTION, "log_level")?;
        }
        if let Some(raw) = map.get("log_format") {
            config.format = parse_log_format(raw, TELEMETRY_SECTION, "log_format")?;
        }
        Ok(config)
    }
}
