//! # Design
//!
//! - Constant messages; the failing operation and path are carried as fields.
//! - Per-entry deletion failures are not errors: they are collected in reports.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by temporary storage management.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A path expected to be a directory exists as something else.
    #[error("storage path is not a directory")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// IO failures while interacting with the filesystem.
    #[error("storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A blocking filesystem task could not be joined.
    #[error("storage task failed")]
    Join {
        /// Operation executed by the task.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn join(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Join { operation, source }
    }
}
