//! # Design
//!
//! - Keep error messages constant; the offending variable and value travel as fields.
//! - Reasons are machine-readable tokens so callers can match without parsing text.

use thiserror::Error;

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading service configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that failed validation.
    #[error("invalid configuration value")]
    InvalidField {
        /// Environment variable that failed validation.
        variable: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl ConfigError {
    pub(crate) fn invalid(variable: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidField {
            variable,
            reason,
            value: Some(value.to_string()),
        }
    }

    /// Environment variable associated with the failure.
    #[must_use]
    pub const fn variable(&self) -> &'static str {
        match self {
            Self::InvalidField { variable, .. } => variable,
        }
    }

    /// Machine-readable reason associated with the failure.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidField { reason, .. } => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_keeps_context_out_of_message() {
        let err = ConfigError::invalid("RECOLOR_HTTP_PORT", "out_of_range", "70000");
        assert_eq!(err.to_string(), "invalid configuration value");
        assert_eq!(err.variable(), "RECOLOR_HTTP_PORT");
        assert_eq!(err.reason(), "out_of_range");
        assert!(matches!(
            err,
            ConfigError::InvalidField { value: Some(ref value), .. } if value == "70000"
        ));
    }
}
