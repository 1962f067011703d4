//! Subprocess-backed [`Worker`] implementation.
//!
//! # Design
//! - One child per invocation; stdin is closed, stdout/stderr are drained concurrently
//!   so a chatty worker never blocks on a full pipe.
//! - Success is decided solely by the exit status.
//! - The child leads its own process group. A timeout kills the group, dropping the
//!   invocation future kills it too, and stragglers are killed once the child exits.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use recolor_storage::ensure_dir;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::WorkerCommand;
use crate::error::{WorkerError, WorkerResult};
use crate::group::GroupGuard;
use crate::output::{Channel, drain};
use crate::{Invocation, Worker};

const DEFAULT_OUTPUT_TAIL_BYTES: usize = 16 * 1024;
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs the worker as a child process.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    command: WorkerCommand,
    timeout: Option<Duration>,
    tail_bytes: usize,
}

impl ProcessWorker {
    /// Worker that waits indefinitely for the child to exit.
    #[must_use]
    pub const fn new(command: WorkerCommand) -> Self {
        Self {
            command,
            timeout: None,
            tail_bytes: DEFAULT_OUTPUT_TAIL_BYTES,
        }
    }

    /// Bound each invocation by `timeout`; `None` removes the bound.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of bytes of stdout/stderr retained per stream.
    #[must_use]
    pub const fn with_tail_bytes(mut self, tail_bytes: usize) -> Self {
        self.tail_bytes = tail_bytes;
        self
    }

    /// Command executed for each invocation.
    #[must_use]
    pub const fn command(&self) -> &WorkerCommand {
        &self.command
    }

    fn spawn_drains(&self, child: &mut Child) -> [Option<JoinHandle<String>>; 2] {
        let limit = self.tail_bytes;
        let stdout = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(drain(pipe, Channel::Stdout, limit)));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(drain(pipe, Channel::Stderr, limit)));
        [stdout, stderr]
    }
}

#[async_trait]
impl Worker for ProcessWorker {
    async fn invoke(&self, input: &Path, output_dir: &Path) -> WorkerResult<Invocation> {
        ensure_dir(output_dir)
            .await
            .map_err(|source| WorkerError::OutputDir {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let started = Instant::now();
        let mut child = self
            .command
            .build(input, output_dir)
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                program: self.command.program().to_string(),
                source,
            })?;
        let mut group = GroupGuard::new(child.id());
        debug!(
            pid = child.id(),
            command = %self.command,
            input = %input.display(),
            output_dir = %output_dir.display(),
            "worker spawned"
        );
        let [stdout, stderr] = self.spawn_drains(&mut child);

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };
        let Some(status) = waited else {
            let limit = self.timeout.unwrap_or_default();
            warn!(limit_ms = limit.as_millis(), "worker exceeded time limit; killing");
            group.kill();
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill timed-out worker");
            }
            collect(stdout).await;
            collect(stderr).await;
            return Err(WorkerError::Timeout { limit });
        };
        group.kill();
        let status = status.map_err(|source| WorkerError::Wait { source })?;

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;
        let elapsed = started.elapsed();

        if !status.success() {
            warn!(
                code = status.code(),
                elapsed_ms = elapsed.as_millis(),
                "worker exited unsuccessfully"
            );
            return Err(WorkerError::Exit {
                code: status.code(),
                stderr,
            });
        }

        info!(elapsed_ms = elapsed.as_millis(), "worker finished");
        Ok(Invocation {
            input_path: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed,
        })
    }
}

/// Await a drain task, abandoning it if grandchildren keep the pipe open.
async fn collect(task: Option<JoinHandle<String>>) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Ok(tail)) => tail,
        Ok(Err(err)) => {
            warn!(error = %err, "worker output drain task failed");
            String::new()
        }
        Err(_) => {
            task.abort();
            warn!("worker output still open after exit; abandoning drain");
            String::new()
        }
    }
}
