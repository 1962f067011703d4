//! Background sweep task.
//!
//! # Design
//! - The scheduler is an owned task: [`CleanupScheduler::spawn`] returns the only handle
//!   that can stop it.
//! - State and the last sweep are published through watch channels so readers never block
//!   the task.
//! - Shutdown is observed while waiting for the next trigger only; a running sweep always
//!   completes first.
//! - Sweep failures are logged and recorded; the next trigger runs as usual.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use recolor_storage::{Clock, SweepReport, TempStorage};
use recolor_telemetry::Metrics;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{CleanupError, CleanupResult};
use crate::schedule::CleanupSchedule;

/// Lifecycle of the scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Waiting for the next trigger.
    Idle,
    /// A sweep is in progress.
    Running,
    /// The task has exited.
    Stopped,
}

/// Outcome of one sweep run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    /// When the sweep started.
    pub started_at: DateTime<Utc>,
    /// When the sweep finished.
    pub finished_at: DateTime<Utc>,
    /// Report for a sweep that ran to completion.
    pub report: Option<SweepReport>,
    /// Error message for a sweep that aborted.
    pub error: Option<String>,
}

impl SweepSummary {
    /// Whether the sweep ran to completion.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.report.is_some()
    }
}

/// Sweeps temporary storage on a cron schedule.
pub struct CleanupScheduler {
    storage: TempStorage,
    schedule: CleanupSchedule,
    retention: Duration,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl CleanupScheduler {
    /// Assemble a scheduler; nothing runs until [`Self::spawn`].
    #[must_use]
    pub fn new(
        storage: TempStorage,
        schedule: CleanupSchedule,
        retention: Duration,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            schedule,
            retention,
            clock,
            metrics,
        }
    }

    /// Run a single sweep now.
    pub async fn run_once(&self) -> SweepSummary {
        let started_at = self.clock.now();
        let outcome = self.storage.sweep(self.retention, started_at).await;
        let finished_at = self.clock.now();

        match outcome {
            Ok(report) => {
                self.metrics
                    .sweep_completed(report.removed(), report.failed());
                SweepSummary {
                    started_at,
                    finished_at,
                    report: Some(report),
                    error: None,
                }
            }
            Err(err) => {
                self.metrics.sweep_failed();
                warn!(root = %self.storage.root().display(), error = %err, "storage sweep failed");
                SweepSummary {
                    started_at,
                    finished_at,
                    report: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Start the background task.
    #[must_use]
    pub fn spawn(self) -> CleanupHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (last_run_tx, last_run_rx) = watch::channel(None);

        let span = info_span!(
            "cleanup.scheduler",
            schedule = %self.schedule,
            retention_secs = self.retention.as_secs(),
        );
        let join = tokio::spawn(
            self.run_loop(shutdown_rx, state_tx, last_run_tx)
                .instrument(span),
        );

        CleanupHandle {
            shutdown_tx,
            join,
            monitor: CleanupMonitor {
                state: state_rx,
                last_run: last_run_rx,
            },
        }
    }

    async fn run_loop(
        self,
        mut shutdown: watch::Receiver<bool>,
        state: watch::Sender<SchedulerState>,
        last_run: watch::Sender<Option<SweepSummary>>,
    ) {
        info!("cleanup scheduler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            let Some(delay) = self.delay_until_next() else {
                warn!("cleanup schedule has no upcoming trigger");
                break;
            };
            debug!(delay_secs = delay.as_secs(), "next sweep scheduled");

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                () = tokio::time::sleep(delay) => {}
            }

            state.send_replace(SchedulerState::Running);
            let summary = self.run_once().await;
            last_run.send_replace(Some(summary));
            state.send_replace(SchedulerState::Idle);
        }
        state.send_replace(SchedulerState::Stopped);
        info!("cleanup scheduler stopped");
    }

    fn delay_until_next(&self) -> Option<Duration> {
        let now = self.clock.now();
        let next = self.schedule.next_after(&now.with_timezone(&Local))?;
        Some(
            next.with_timezone(&Utc)
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}

/// Read-only view of the scheduler.
#[derive(Debug, Clone)]
pub struct CleanupMonitor {
    state: watch::Receiver<SchedulerState>,
    last_run: watch::Receiver<Option<SweepSummary>>,
}

impl CleanupMonitor {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Most recent sweep, if any has run.
    #[must_use]
    pub fn last_run(&self) -> Option<SweepSummary> {
        self.last_run.borrow().clone()
    }

    /// Wait for the next sweep to finish.
    ///
    /// Returns `None` once the scheduler has exited.
    pub async fn next_run(&mut self) -> Option<SweepSummary> {
        self.last_run.changed().await.ok()?;
        self.last_run.borrow_and_update().clone()
    }
}

/// Owning handle for the scheduler task.
#[derive(Debug)]
pub struct CleanupHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    monitor: CleanupMonitor,
}

impl CleanupHandle {
    /// Observer for state and sweep results.
    #[must_use]
    pub fn monitor(&self) -> CleanupMonitor {
        self.monitor.clone()
    }

    /// Stop the task, letting an in-progress sweep finish.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::Join`] if the task panicked.
    pub async fn shutdown(self) -> CleanupResult<()> {
        self.shutdown_tx.send_replace(true);
        self.join.await.map_err(CleanupError::join)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use recolor_storage::{FixedClock, StagingLayout};
    use tempfile::TempDir;

    fn fixed_clock() -> Result<Arc<dyn Clock>> {
        let instant = DateTime::parse_from_rfc3339("2024-03-10T12:00:30Z")?.with_timezone(&Utc);
        Ok(Arc::new(FixedClock::new(instant)))
    }

    fn scheduler(
        storage: TempStorage,
        expression: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<(CleanupScheduler, Metrics)> {
        let metrics = Metrics::new()?;
        let scheduler = CleanupScheduler::new(
            storage,
            CleanupSchedule::parse(expression)?,
            Duration::ZERO,
            clock,
            metrics.clone(),
        );
        Ok((scheduler, metrics))
    }

    #[tokio::test]
    async fn run_once_sweeps_empty_root() -> Result<()> {
        let temp = TempDir::new()?;
        let (scheduler, metrics) =
            scheduler(TempStorage::new(temp.path())?, "0 0 * * *", fixed_clock()?)?;

        let summary = scheduler.run_once().await;
        assert!(summary.succeeded());
        assert_eq!(summary.report.map(|report| report.examined), Some(0));
        assert!(temp.path().is_dir());
        assert_eq!(metrics.snapshot().sweeps_completed_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn run_once_records_failures() -> Result<()> {
        let temp = TempDir::new()?;
        let not_a_dir = temp.path().join("file");
        std::fs::write(&not_a_dir, b"x")?;
        let (scheduler, metrics) =
            scheduler(TempStorage::new(&not_a_dir)?, "0 0 * * *", fixed_clock()?)?;

        let summary = scheduler.run_once().await;
        assert!(!summary.succeeded());
        assert!(summary.error.is_some());
        assert_eq!(metrics.snapshot().sweeps_failed_total, 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_sweep_clears_root() -> Result<()> {
        let temp = TempDir::new()?;
        std::fs::write(temp.path().join("1.jpg"), b"a")?;
        std::fs::write(temp.path().join("2.png"), b"b")?;
        std::fs::create_dir(temp.path().join("generated"))?;
        std::fs::write(temp.path().join("generated").join("1.jpg"), b"c")?;

        let storage = TempStorage::new(temp.path())?.with_layout(StagingLayout::Shared);
        let (scheduler, _metrics) = scheduler(storage, "* * * * *", fixed_clock()?)?;
        let handle = scheduler.spawn();
        let mut monitor = handle.monitor();

        let summary = monitor.next_run().await;
        assert!(summary.as_ref().is_some_and(SweepSummary::succeeded));
        assert!(temp.path().is_dir());
        assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);

        handle.shutdown().await?;
        assert_eq!(monitor.state(), SchedulerState::Stopped);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_idle_stops_without_sweeping() -> Result<()> {
        let temp = TempDir::new()?;
        std::fs::write(temp.path().join("keep.jpg"), b"a")?;
        let (scheduler, metrics) =
            scheduler(TempStorage::new(temp.path())?, "0 0 * * *", fixed_clock()?)?;

        let handle = scheduler.spawn();
        let monitor = handle.monitor();
        assert_eq!(monitor.state(), SchedulerState::Idle);

        handle.shutdown().await?;
        assert_eq!(monitor.state(), SchedulerState::Stopped);
        assert!(monitor.last_run().is_none());
        assert!(temp.path().join("keep.jpg").exists());
        assert_eq!(metrics.snapshot().sweeps_completed_total, 0);
        Ok(())
    }
}
