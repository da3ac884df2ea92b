//! Error types for configuration parsing.

use thiserror::Error;

/// Structured errors emitted while parsing or validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The section payload was not a JSON object.
    #[error("section '{section}' must be a JSON object")]
    InvalidSection {
        /// Section that failed validation.
        section: String,
    },
    /// Field contained an invalid value.
    #[error("invalid value for '{field}' in '{section}': {message}")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Human-readable error description.
        message: String,
    },
    /// Field did not exist in the target section.
    #[error("unknown field '{field}' in '{section}' settings")]
    UnknownField {
        /// Section where the unknown field was encountered.
        section: String,
        /// Name of the unexpected field.
        field: String,
    },
    /// A name did not match any variant of a keyword enum.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant {
        /// What was being parsed, e.g. `log format`.
        kind: &'static str,
        /// Rejected input.
        value: String,
    },
    /// An environment override could not be parsed.
    #[error("invalid value for environment variable '{variable}': {message}")]
    InvalidEnv {
        /// Environment variable name.
        variable: &'static str,
        /// Human-readable error description.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(section: &str, field: &str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            section: section.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
