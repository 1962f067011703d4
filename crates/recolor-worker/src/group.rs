//! Process-group ownership for worker children.
//!
//! # Design
//! - On unix the worker leads its own process group, so wrappers such as `conda run`
//!   cannot leave the model process running once the job is abandoned.
//! - The guard kills the whole group when dropped; an abandoned invocation future
//!   therefore takes every descendant with it.

/// Kills the worker's process group when dropped or asked to.
#[derive(Debug)]
pub(crate) struct GroupGuard {
    pgid: Option<i32>,
}

impl GroupGuard {
    /// Guard the group led by `pid`, the freshly spawned child.
    pub(crate) fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    /// Send `SIGKILL` to every process left in the group. Later calls are no-ops.
    pub(crate) fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: i32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => tracing::debug!(pgid, "worker process group killed"),
        Err(Errno::ESRCH) => {}
        Err(err) => tracing::warn!(pgid, error = %err, "failed to kill worker process group"),
    }
}

#[cfg(not(unix))]
const fn kill_group(_pgid: i32) {}
