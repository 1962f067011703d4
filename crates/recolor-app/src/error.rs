//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: recolor_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: recolor_telemetry::TelemetryError,
    },
    /// Temporary storage could not be prepared.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source storage error.
        source: recolor_storage::StorageError,
    },
    /// The cleanup scheduler could not be configured or stopped.
    #[error("cleanup operation failed")]
    Cleanup {
        /// Operation identifier.
        operation: &'static str,
        /// Source cleanup error.
        source: recolor_cleanup::CleanupError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: recolor_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: recolor_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: recolor_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn storage(
        operation: &'static str,
        source: recolor_storage::StorageError,
    ) -> Self {
        Self::Storage { operation, source }
    }

    pub(crate) const fn cleanup(
        operation: &'static str,
        source: recolor_cleanup::CleanupError,
    ) -> Self {
        Self::Cleanup { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: recolor_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn app_error_helpers_build_variants() -> Result<(), Box<dyn Error>> {
        let config = AppError::config(
            "service_config.from_env",
            recolor_config::ConfigError::InvalidField {
                variable: "RECOLOR_HTTP_PORT",
                reason: "out_of_range",
                value: Some("0".to_string()),
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let storage = AppError::storage(
            "storage.ensure_root",
            recolor_storage::StorageError::NotADirectory {
                path: PathBuf::from("tmp"),
            },
        );
        assert!(matches!(
            storage,
            AppError::Storage {
                operation: "storage.ensure_root",
                ..
            }
        ));

        let api = AppError::api_server(
            "api_server.serve",
            recolor_api::ApiServerError::Serve {
                source: io::Error::other("stopped"),
            },
        );
        assert_eq!(api.to_string(), "api server operation failed");
        assert!(api.source().is_some());
        Ok(())
    }
}
