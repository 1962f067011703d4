//! # Design
//!
//! - Schedule problems carry the offending expression and a stable reason token.
//! - Parser errors from the cron crate are preserved as sources.

use thiserror::Error;
use tokio::task::JoinError;

/// Result alias for cleanup operations.
pub type CleanupResult<T> = Result<T, CleanupError>;

/// Errors produced by the cleanup scheduler.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// The expression is not a five-field cron expression we accept.
    #[error("invalid cleanup schedule")]
    InvalidSchedule {
        /// Expression as supplied.
        expression: String,
        /// Why it was refused.
        reason: &'static str,
    },
    /// The cron parser refused the normalised expression.
    #[error("failed to parse cleanup schedule")]
    ScheduleParse {
        /// Expression as supplied.
        expression: String,
        /// Underlying parser error.
        source: cron::error::Error,
    },
    /// The scheduler task panicked or was cancelled.
    #[error("cleanup task failed")]
    Join {
        /// Underlying join error.
        source: JoinError,
    },
}

impl CleanupError {
    pub(crate) fn invalid(expression: &str, reason: &'static str) -> Self {
        Self::InvalidSchedule {
            expression: expression.to_string(),
            reason,
        }
    }

    pub(crate) const fn join(source: JoinError) -> Self {
        Self::Join { source }
    }

    /// Reason token for refused schedules.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::InvalidSchedule { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_schedule_keeps_context() {
        let err = CleanupError::invalid("* *", "expected_five_fields");
        assert_eq!(err.to_string(), "invalid cleanup schedule");
        assert_eq!(err.reason(), Some("expected_five_fields"));
        assert!(err.source().is_none());
        assert!(matches!(
            err,
            CleanupError::InvalidSchedule { ref expression, .. } if expression == "* *"
        ));
    }
}
