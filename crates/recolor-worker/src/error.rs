//! # Design
//!
//! - Distinguish "could not start", "ran and failed" and "ran too long" so callers can map them.
//! - Keep the worker's diagnostic tail on exit failures; it is advisory, not part of the message.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use recolor_storage::StorageError;
use thiserror::Error;

/// Result alias for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors produced while invoking the external worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The output directory could not be prepared.
    #[error("worker output directory unavailable")]
    OutputDir {
        /// Directory that could not be prepared.
        path: PathBuf,
        /// Underlying storage error.
        source: StorageError,
    },
    /// The worker process could not be started.
    #[error("failed to spawn worker process")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Waiting on the worker process failed.
    #[error("failed to wait for worker process")]
    Wait {
        /// Underlying IO error.
        source: io::Error,
    },
    /// The worker exited with a non-zero status or was terminated by a signal.
    #[error("worker process exited unsuccessfully")]
    Exit {
        /// Exit code, absent when terminated by a signal.
        code: Option<i32>,
        /// Tail of the worker's standard error.
        stderr: String,
    },
    /// The worker exceeded its time limit and was killed.
    #[error("worker process exceeded its time limit")]
    Timeout {
        /// Limit that was exceeded.
        limit: Duration,
    },
}

impl WorkerError {
    /// Whether the failure was a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Exit code reported by the worker, if it ran to completion.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn worker_error_display_and_source() {
        let cases = vec![
            (
                WorkerError::OutputDir {
                    path: PathBuf::from("generated"),
                    source: StorageError::NotADirectory {
                        path: PathBuf::from("generated"),
                    },
                },
                "worker output directory unavailable",
                true,
            ),
            (
                WorkerError::Spawn {
                    program: "conda".to_string(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                },
                "failed to spawn worker process",
                true,
            ),
            (
                WorkerError::Wait {
                    source: io::Error::other("wait"),
                },
                "failed to wait for worker process",
                true,
            ),
            (
                WorkerError::Exit {
                    code: Some(1),
                    stderr: "boom".to_string(),
                },
                "worker process exited unsuccessfully",
                false,
            ),
            (
                WorkerError::Timeout {
                    limit: Duration::from_secs(1),
                },
                "worker process exceeded its time limit",
                false,
            ),
        ];

        for (err, message, has_source) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(err.source().is_some(), has_source);
        }
    }

    #[test]
    fn helpers_expose_exit_code_and_timeout() {
        let exit = WorkerError::Exit {
            code: Some(3),
            stderr: String::new(),
        };
        assert_eq!(exit.exit_code(), Some(3));
        assert!(!exit.is_timeout());

        let timeout = WorkerError::Timeout {
            limit: Duration::from_secs(5),
        };
        assert!(timeout.is_timeout());
        assert_eq!(timeout.exit_code(), None);
    }
}
