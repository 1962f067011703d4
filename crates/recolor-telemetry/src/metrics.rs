//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Job outcomes are labelled with the error kind so failures can be told apart.
//! - In-flight jobs are tracked with a drop guard so aborted requests still decrement.

use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

const OUTCOME_SUCCEEDED: &str = "succeeded";
const SWEEP_COMPLETED: &str = "completed";
const SWEEP_FAILED: &str = "failed";

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    jobs_total: IntCounterVec,
    jobs_in_flight: IntGauge,
    worker_last_duration_ms: IntGauge,
    sweeps_total: IntCounterVec,
    swept_entries_total: IntCounter,
    sweep_entry_failures_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Jobs currently running.
    pub jobs_in_flight: i64,
    /// Jobs that returned a result.
    pub jobs_succeeded_total: u64,
    /// Duration of the most recent successful worker run, in milliseconds.
    pub worker_last_duration_ms: i64,
    /// Sweeps that ran to completion.
    pub sweeps_completed_total: u64,
    /// Sweeps that aborted with an error.
    pub sweeps_failed_total: u64,
    /// Entries removed across all sweeps.
    pub swept_entries_total: u64,
}

/// Decrements the in-flight gauge when dropped.
#[must_use = "the job is counted as in flight until the guard is dropped"]
pub struct InFlightGuard {
    gauge: IntGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = register(
            &registry,
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        let jobs_total = register(
            &registry,
            "colorize_jobs_total",
            IntCounterVec::new(
                Opts::new("colorize_jobs_total", "Colorization jobs finished by outcome"),
                &["outcome"],
            ),
        )?;
        let jobs_in_flight = register(
            &registry,
            "colorize_jobs_in_flight",
            IntGauge::with_opts(Opts::new(
                "colorize_jobs_in_flight",
                "Colorization jobs currently running",
            )),
        )?;
        let worker_last_duration_ms = register(
            &registry,
            "worker_last_duration_ms",
            IntGauge::with_opts(Opts::new(
                "worker_last_duration_ms",
                "Duration of the most recent successful worker run (ms)",
            )),
        )?;
        let sweeps_total = register(
            &registry,
            "cleanup_sweeps_total",
            IntCounterVec::new(
                Opts::new("cleanup_sweeps_total", "Cleanup sweeps executed by status"),
                &["status"],
            ),
        )?;
        let swept_entries_total = register(
            &registry,
            "cleanup_swept_entries_total",
            IntCounter::with_opts(Opts::new(
                "cleanup_swept_entries_total",
                "Entries removed by cleanup sweeps",
            )),
        )?;
        let sweep_entry_failures_total = register(
            &registry,
            "cleanup_entry_failures_total",
            IntCounter::with_opts(Opts::new(
                "cleanup_entry_failures_total",
                "Entries cleanup sweeps failed to remove",
            )),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                jobs_total,
                jobs_in_flight,
                worker_last_duration_ms,
                sweeps_total,
                swept_entries_total,
                sweep_entry_failures_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Mark a job as started; the returned guard marks it finished when dropped.
    pub fn job_started(&self) -> InFlightGuard {
        self.inner.jobs_in_flight.inc();
        InFlightGuard {
            gauge: self.inner.jobs_in_flight.clone(),
        }
    }

    /// Record a job that returned a result.
    pub fn job_succeeded(&self, worker_elapsed: Duration) {
        self.inner
            .jobs_total
            .with_label_values(&[OUTCOME_SUCCEEDED])
            .inc();
        self.inner
            .worker_last_duration_ms
            .set(Self::duration_to_ms(worker_elapsed));
    }

    /// Record a job that failed with the given error kind.
    pub fn job_failed(&self, kind: &str) {
        self.inner.jobs_total.with_label_values(&[kind]).inc();
    }

    /// Record a sweep that ran to completion.
    pub fn sweep_completed(&self, removed: usize, failed: usize) {
        self.inner
            .sweeps_total
            .with_label_values(&[SWEEP_COMPLETED])
            .inc();
        self.inner
            .swept_entries_total
            .inc_by(u64::try_from(removed).unwrap_or(u64::MAX));
        self.inner
            .sweep_entry_failures_total
            .inc_by(u64::try_from(failed).unwrap_or(u64::MAX));
    }

    /// Record a sweep that aborted.
    pub fn sweep_failed(&self) {
        self.inner
            .sweeps_total
            .with_label_values(&[SWEEP_FAILED])
            .inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_in_flight: self.inner.jobs_in_flight.get(),
            jobs_succeeded_total: self
                .inner
                .jobs_total
                .with_label_values(&[OUTCOME_SUCCEEDED])
                .get(),
            worker_last_duration_ms: self.inner.worker_last_duration_ms.get(),
            sweeps_completed_total: self
                .inner
                .sweeps_total
                .with_label_values(&[SWEEP_COMPLETED])
                .get(),
            sweeps_failed_total: self
                .inner
                .sweeps_total
                .with_label_values(&[SWEEP_FAILED])
                .get(),
            swept_entries_total: self.inner.swept_entries_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

fn register<C>(
    registry: &Registry,
    name: &'static str,
    built: std::result::Result<C, prometheus::Error>,
) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = built.map_err(|source| TelemetryError::MetricsCollector { name, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}
