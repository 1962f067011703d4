//! Typed configuration sections consumed by the service crates.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::defaults;

/// Fully validated service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub http: HttpSettings,
    /// Temporary storage settings.
    pub storage: StorageSettings,
    /// External worker settings.
    pub worker: WorkerSettings,
    /// Background cleanup settings.
    pub cleanup: CleanupSettings,
    /// Tracing subscriber settings.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Interface the listener binds to.
    pub bind_addr: IpAddr,
    /// Port the listener binds to.
    pub port: u16,
}

impl HttpSettings {
    /// Socket address assembled from the bind address and port.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// How staged uploads and outputs are partitioned beneath the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingLayout {
    /// Each job stages into `<root>/<job_id>` with outputs in `<root>/<job_id>/<output_dir>`.
    #[default]
    PerJob,
    /// All jobs stage into `<root>` and write outputs into `<root>/<output_dir>`.
    Shared,
}

impl StagingLayout {
    /// Parse the configuration token for a layout.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_job" | "per-job" => Some(Self::PerJob),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }

    /// Stable token used in configuration and health output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerJob => "per_job",
            Self::Shared => "shared",
        }
    }
}

/// Temporary storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Root directory for staged uploads and outputs.
    pub root: PathBuf,
    /// Name of the output directory inside a staging directory.
    pub output_dir: String,
    /// Partitioning strategy for concurrent jobs.
    pub layout: StagingLayout,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: u64,
    /// Largest worker result read back in bytes.
    pub max_result_bytes: u64,
}

/// External worker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Executable launched for each job.
    pub program: String,
    /// Wrapper arguments placed before `<input> <output_dir>`.
    pub args: Vec<String>,
    /// Upper bound on a single invocation; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Background cleanup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSettings {
    /// Five-field cron expression, evaluated in local time.
    pub schedule: String,
    /// Minimum age before an entry is swept; zero sweeps everything.
    pub retention: Duration,
}

/// Output format requested for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

impl LogOutput {
    /// Parse the configuration token for a log format.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Explicit output format; `None` lets the telemetry crate infer one.
    pub format: Option<LogOutput>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http: HttpSettings {
                bind_addr: defaults::BIND_ADDR,
                port: defaults::HTTP_PORT,
            },
            storage: StorageSettings {
                root: PathBuf::from(defaults::STORAGE_ROOT),
                output_dir: defaults::OUTPUT_DIR.to_string(),
                layout: StagingLayout::default(),
                max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
                max_result_bytes: defaults::MAX_RESULT_BYTES,
            },
            worker: WorkerSettings {
                program: defaults::WORKER_PROGRAM.to_string(),
                args: defaults::WORKER_ARGS
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                timeout: Some(Duration::from_secs(defaults::WORKER_TIMEOUT_SECS)),
            },
            cleanup: CleanupSettings {
                schedule: defaults::CLEANUP_SCHEDULE.to_string(),
                retention: Duration::from_secs(defaults::CLEANUP_RETENTION_SECS),
            },
            logging: LoggingSettings {
                level: defaults::LOG_LEVEL.to_string(),
                format: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_layout_tokens_round_trip() {
        for layout in [StagingLayout::PerJob, StagingLayout::Shared] {
            assert_eq!(StagingLayout::parse(layout.as_str()), Some(layout));
        }
        assert_eq!(StagingLayout::parse("Per-Job"), Some(StagingLayout::PerJob));
        assert_eq!(StagingLayout::parse("bucketed"), None);
    }

    #[test]
    fn staging_layout_serializes_as_snake_case() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&StagingLayout::PerJob)?,
            "\"per_job\""
        );
        Ok(())
    }

    #[test]
    fn defaults_match_single_host_deployment() {
        let config = ServiceConfig::default();
        assert_eq!(config.http.socket_addr().to_string(), "127.0.0.1:8000");
        assert_eq!(config.storage.root, PathBuf::from("tmp"));
        assert_eq!(config.storage.output_dir, "generated");
        assert_eq!(config.worker.program, "conda");
        assert_eq!(
            config.worker.args,
            ["run", "-n", "deold", "python", "./server/python/colorize.py"]
        );
        assert_eq!(config.cleanup.schedule, "0 0 * * *");
    }

    #[test]
    fn log_output_accepts_known_tokens() {
        assert_eq!(LogOutput::parse("JSON"), Some(LogOutput::Json));
        assert_eq!(LogOutput::parse("text"), Some(LogOutput::Pretty));
        assert_eq!(LogOutput::parse("xml"), None);
    }
}
