//! Validation helpers and parsing utilities for configuration documents.

use std::num::NonZeroUsize;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::model::LogFormat;

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn as_section<'a>(value: &'a Value, section: &str) -> ConfigResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| ConfigError::InvalidSection {
        section: section.to_string(),
    })
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn ensure_known_fields(
    map: &Map<String, Value>,
    section: &str,
    allowed: &[&str],
) -> ConfigResult<()> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(field) => Err(ConfigError::UnknownField {
            section: section.to_string(),
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

/// Parse an optional capacity. `null` and `0` both mean "unbounded".
#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_capacity(
    value: &Value,
    section: &str,
    field: &str,
) -> ConfigResult<Option<NonZeroUsize>> {
    if value.is_null() {
        return Ok(None);
    }

    let raw = value.as_u64().ok_or_else(|| {
        ConfigError::invalid_field(section, field, "must be a non-negative integer or null")
    })?;
    let capacity = usize::try_from(raw).map_err(|_| {
        ConfigError::invalid_field(section, field, "must fit within the platform word size")
    })?;

    Ok(NonZeroUsize::new(capacity))
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_capacity_str(raw: &str) -> Result<Option<NonZeroUsize>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<usize>()
        .map(NonZeroUsize::new)
        .map_err(|err| format!("'{trimmed}' is not a non-negative integer: {err}"))
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_log_level(value: &Value, section: &str, field: &str) -> ConfigResult<String> {
    let level = value
        .as_str()
        .ok_or_else(|| ConfigError::invalid_field(section, field, "must be a string"))?
        .trim();

    if level.is_empty() {
        return Err(ConfigError::invalid_field(section, field, "must not be empty"));
    }

    Ok(level.to_string())
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn parse_log_format(value: &Value, section: &str, field: &str) -> ConfigResult<LogFormat> {
    let raw = value
        .as_str()
        .ok_or_else(|| ConfigError::invalid_field(section, field, "must be a string"))?;

    LogFormat::from_str(raw)
        .map_err(|err| ConfigError::invalid_field(section, field, err.to_string()))
}
