//! Default values applied when an environment variable is unset.
//!
//! # Design
//! - Keep every fallback in one place so the loader and tests agree.
//! - Defaults mirror a single-host development deployment.

use std::net::{IpAddr, Ipv4Addr};

/// Listen address for the HTTP surface.
pub const BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// Listen port for the HTTP surface.
pub const HTTP_PORT: u16 = 8000;
/// Root directory for staged uploads and worker outputs.
pub const STORAGE_ROOT: &str = "tmp";
/// Name of the worker output directory beneath a staging directory.
pub const OUTPUT_DIR: &str = "generated";
/// Executable used to launch the colorization worker.
pub const WORKER_PROGRAM: &str = "conda";
/// Wrapper arguments inserted before `<input> <output_dir>`.
pub const WORKER_ARGS: &str = "run -n deold python ./server/python/colorize.py";
/// Upper bound on a single worker invocation, in seconds.
pub const WORKER_TIMEOUT_SECS: u64 = 600;
/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
/// Largest worker result loaded into memory, in bytes.
pub const MAX_RESULT_BYTES: u64 = 50 * 1024 * 1024;
/// Five-field cron expression for the cleanup sweep (daily at midnight).
pub const CLEANUP_SCHEDULE: &str = "0 0 * * *";
/// Minimum age, in seconds, before the sweep removes an entry.
pub const CLEANUP_RETENTION_SECS: u64 = 3_600;
/// Default tracing filter when `RUST_LOG` is not provided.
pub const LOG_LEVEL: &str = "info";
