//! Environment-backed configuration loading.
//!
//! # Design
//! - Every variable is optional; unset or blank values fall back to `defaults`.
//! - Lookup is injected so tests never mutate the process environment.
//! - Validation stops at the first invalid variable and reports it verbatim.

use std::net::IpAddr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    CleanupSettings, HttpSettings, LogOutput, LoggingSettings, ServiceConfig, StagingLayout,
    StorageSettings, WorkerSettings,
};

const ENV_BIND_ADDR: &str = "RECOLOR_BIND_ADDR";
const ENV_HTTP_PORT: &str = "RECOLOR_HTTP_PORT";
const ENV_STORAGE_ROOT: &str = "RECOLOR_STORAGE_ROOT";
const ENV_OUTPUT_DIR: &str = "RECOLOR_OUTPUT_DIR";
const ENV_STAGING_LAYOUT: &str = "RECOLOR_STAGING_LAYOUT";
const ENV_WORKER_PROGRAM: &str = "RECOLOR_WORKER_PROGRAM";
const ENV_WORKER_ARGS: &str = "RECOLOR_WORKER_ARGS";
const ENV_WORKER_TIMEOUT_SECS: &str = "RECOLOR_WORKER_TIMEOUT_SECS";
const ENV_MAX_UPLOAD_BYTES: &str = "RECOLOR_MAX_UPLOAD_BYTES";
const ENV_MAX_RESULT_BYTES: &str = "RECOLOR_MAX_RESULT_BYTES";
const ENV_CLEANUP_SCHEDULE: &str = "RECOLOR_CLEANUP_SCHEDULE";
const ENV_CLEANUP_RETENTION_SECS: &str = "RECOLOR_CLEANUP_RETENTION_SECS";
const ENV_LOG_LEVEL: &str = "RECOLOR_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "RECOLOR_LOG_FORMAT";

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first variable that fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first variable that fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let http = HttpSettings {
            bind_addr: read(ENV_BIND_ADDR)
                .map(|value| parse_ip(ENV_BIND_ADDR, &value))
                .transpose()?
                .unwrap_or(defaults.http.bind_addr),
            port: read(ENV_HTTP_PORT)
                .map(|value| parse_port(ENV_HTTP_PORT, &value))
                .transpose()?
                .unwrap_or(defaults.http.port),
        };

        let storage = StorageSettings {
            root: read(ENV_STORAGE_ROOT).map_or(defaults.storage.root, PathBuf::from),
            output_dir: read(ENV_OUTPUT_DIR)
                .map(|value| parse_dir_name(ENV_OUTPUT_DIR, value))
                .transpose()?
                .unwrap_or(defaults.storage.output_dir),
            layout: read(ENV_STAGING_LAYOUT)
                .map(|value| {
                    StagingLayout::parse(&value).ok_or_else(|| {
                        ConfigError::invalid(ENV_STAGING_LAYOUT, "unknown_layout", &value)
                    })
                })
                .transpose()?
                .unwrap_or(defaults.storage.layout),
            max_upload_bytes: read(ENV_MAX_UPLOAD_BYTES)
                .map(|value| parse_positive(ENV_MAX_UPLOAD_BYTES, &value))
                .transpose()?
                .unwrap_or(defaults.storage.max_upload_bytes),
            max_result_bytes: read(ENV_MAX_RESULT_BYTES)
                .map(|value| parse_positive(ENV_MAX_RESULT_BYTES, &value))
                .transpose()?
                .unwrap_or(defaults.storage.max_result_bytes),
        };

        let worker = WorkerSettings {
            program: read(ENV_WORKER_PROGRAM).unwrap_or(defaults.worker.program),
            args: read(ENV_WORKER_ARGS).map_or(defaults.worker.args, |value| {
                value.split_whitespace().map(str::to_string).collect()
            }),
            timeout: match read(ENV_WORKER_TIMEOUT_SECS) {
                Some(value) => parse_optional_secs(ENV_WORKER_TIMEOUT_SECS, &value)?,
                None => defaults.worker.timeout,
            },
        };

        let cleanup = CleanupSettings {
            schedule: read(ENV_CLEANUP_SCHEDULE).unwrap_or(defaults.cleanup.schedule),
            retention: read(ENV_CLEANUP_RETENTION_SECS)
                .map(|value| parse_u64(ENV_CLEANUP_RETENTION_SECS, &value))
                .transpose()?
                .map_or(defaults.cleanup.retention, Duration::from_secs),
        };

        let logging = LoggingSettings {
            level: read(ENV_LOG_LEVEL).unwrap_or(defaults.logging.level),
            format: read(ENV_LOG_FORMAT)
                .map(|value| {
                    LogOutput::parse(&value)
                        .ok_or_else(|| ConfigError::invalid(ENV_LOG_FORMAT, "unknown_format", &value))
                })
                .transpose()?,
        };

        Ok(Self {
            http,
            storage,
            worker,
            cleanup,
            logging,
        })
    }
}

fn parse_ip(variable: &'static str, value: &str) -> ConfigResult<IpAddr> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(variable, "invalid_ip_address", value))
}

fn parse_port(variable: &'static str, value: &str) -> ConfigResult<u16> {
    let port = parse_u64(variable, value)?;
    if !(1..=65_535).contains(&port) {
        return Err(ConfigError::invalid(variable, "out_of_range", value));
    }
    u16::try_from(port).map_err(|_| ConfigError::invalid(variable, "out_of_range", value))
}

fn parse_u64(variable: &'static str, value: &str) -> ConfigResult<u64> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(variable, "not_an_integer", value))
}

fn parse_positive(variable: &'static str, value: &str) -> ConfigResult<u64> {
    match parse_u64(variable, value)? {
        0 => Err(ConfigError::invalid(variable, "zero", value)),
        parsed => Ok(parsed),
    }
}

fn parse_optional_secs(variable: &'static str, value: &str) -> ConfigResult<Option<Duration>> {
    Ok(match parse_u64(variable, value)? {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    })
}

fn parse_dir_name(variable: &'static str, value: String) -> ConfigResult<String> {
    let mut components = Path::new(&value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(value),
        _ => Err(ConfigError::invalid(variable, "not_a_single_component", &value)),
    }
}
