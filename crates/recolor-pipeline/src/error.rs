//! # Design
//!
//! - One error type for the whole job so the HTTP layer maps a single enum.
//! - `kind()` collapses variants into the externally visible taxonomy.
//! - Client-caused upload problems are a small closed set of [`UploadRejection`]s.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use recolor_storage::StorageError;
use recolor_worker::WorkerError;
use serde::Serialize;
use thiserror::Error;

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Reasons an upload is refused before any worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRejection {
    /// The request carried no file.
    MissingFile,
    /// The file was present but contained no bytes.
    EmptyStream,
    /// The file exceeded the configured size limit.
    TooLarge {
        /// Limit in bytes.
        limit: u64,
    },
}

impl UploadRejection {
    /// Machine-readable token for the rejection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingFile => "missing_file",
            Self::EmptyStream => "empty_stream",
            Self::TooLarge { .. } => "too_large",
        }
    }
}

/// Externally visible failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The upload was missing, empty, too large or could not be staged.
    Upload,
    /// The worker could not be started or exited unsuccessfully.
    Worker,
    /// The worker exceeded its time limit.
    Timeout,
    /// The worker reported success but produced no result.
    NotFound,
    /// The result could not be read back.
    Io,
    /// Temporary storage could not be prepared.
    Storage,
}

impl ErrorKind {
    /// Stable token used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload_error",
            Self::Worker => "worker_error",
            Self::Timeout => "timeout_error",
            Self::NotFound => "not_found_error",
            Self::Io => "io_error",
            Self::Storage => "storage_error",
        }
    }
}

/// Errors produced by a colorization job.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload was refused.
    #[error("upload rejected")]
    Upload {
        /// Why the upload was refused.
        reason: UploadRejection,
    },
    /// Reading the inbound upload stream failed.
    #[error("upload stream failed")]
    UploadStream {
        /// Underlying stream error.
        source: Box<dyn StdError + Send + Sync>,
    },
    /// Writing the staged upload failed.
    #[error("failed to stage upload")]
    UploadWrite {
        /// Operation that failed.
        operation: &'static str,
        /// Staging path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Preparing temporary storage failed.
    #[error("temporary storage unavailable")]
    Storage {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying storage error.
        source: StorageError,
    },
    /// The worker failed.
    #[error("worker invocation failed")]
    Worker {
        /// Underlying worker error.
        source: WorkerError,
    },
    /// The worker reported success but the expected result is absent.
    #[error("worker result not found")]
    NotFound {
        /// Path that was expected to exist.
        path: PathBuf,
    },
    /// The result exceeds the configured size limit.
    #[error("worker result exceeds size limit")]
    ResultTooLarge {
        /// Result path.
        path: PathBuf,
        /// Observed size in bytes.
        size: u64,
        /// Limit in bytes.
        limit: u64,
    },
    /// Reading the result failed.
    #[error("failed to read worker result")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl PipelineError {
    /// Refuse the upload for `reason`.
    #[must_use]
    pub const fn rejected(reason: UploadRejection) -> Self {
        Self::Upload { reason }
    }

    pub(crate) fn upload_write(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::UploadWrite {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn storage(operation: &'static str, source: StorageError) -> Self {
        Self::Storage { operation, source }
    }

    /// Externally visible category of the failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Upload { .. } | Self::UploadStream { .. } | Self::UploadWrite { .. } => {
                ErrorKind::Upload
            }
            Self::Storage { .. }
            | Self::Worker {
                source: WorkerError::OutputDir { .. },
            } => ErrorKind::Storage,
            Self::Worker {
                source: WorkerError::Timeout { .. },
            } => ErrorKind::Timeout,
            Self::Worker { .. } => ErrorKind::Worker,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ResultTooLarge { .. } | Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Rejection reason for refused uploads.
    #[must_use]
    pub const fn rejection(&self) -> Option<UploadRejection> {
        match self {
            Self::Upload { reason } => Some(*reason),
            _ => None,
        }
    }
}

impl From<WorkerError> for PipelineError {
    fn from(source: WorkerError) -> Self {
        Self::Worker { source }
    }
}
