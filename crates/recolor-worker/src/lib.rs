#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Invocation and supervision of the external colorization worker.
//!
//! Layout: `command.rs` (argv assembly), `process.rs` (spawn/wait/timeout),
//! `group.rs` (process-group kill), `output.rs` (stdout/stderr draining), `error.rs`.

pub mod command;
pub mod error;
mod group;
mod output;
pub mod process;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

pub use command::WorkerCommand;
pub use error::{WorkerError, WorkerResult};
pub use process::ProcessWorker;

/// A completed, successful worker execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Input file handed to the worker.
    pub input_path: PathBuf,
    /// Directory the worker wrote into.
    pub output_dir: PathBuf,
    /// Exit code reported by the worker.
    pub exit_code: Option<i32>,
    /// Tail of the worker's standard output.
    pub stdout: String,
    /// Tail of the worker's standard error.
    pub stderr: String,
    /// Wall-clock time between spawn and exit.
    pub elapsed: Duration,
}

/// Runs a transformation over a staged input, writing into an output directory.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Execute the worker for `input`, writing results beneath `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkerError`] when the worker cannot be started, fails, or times out.
    async fn invoke(&self, input: &Path, output_dir: &Path) -> WorkerResult<Invocation>;
}
