use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use recolor_api::ApiServer;
use recolor_cleanup::{CleanupSchedule, CleanupScheduler};
use recolor_config::{LogOutput, ServiceConfig};
use recolor_pipeline::{ColorizePipeline, PipelineLimits};
use recolor_storage::{Clock, SystemClock, TempStorage};
use recolor_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use recolor_worker::{ProcessWorker, WorkerCommand};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the service.
pub(crate) struct BootstrapDependencies {
    config: ServiceConfig,
    telemetry: Metrics,
    clock: Arc<dyn Clock>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = ServiceConfig::from_env()
            .map_err(|err| AppError::config("service_config.from_env", err))?;
        Self::with_config(config)
    }

    pub(crate) fn with_config(config: ServiceConfig) -> AppResult<Self> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            telemetry,
            clock: Arc::new(SystemClock),
        })
    }
}

/// Entry point for the service boot sequence.
///
/// Installs logging, then serves until Ctrl-C (or SIGTERM on unix).
///
/// # Errors
///
/// Returns an error if configuration, logging, storage or the listener cannot be set up.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = &dependencies.config.logging;
    recolor_telemetry::init_logging(&LoggingConfig {
        level: &logging.level,
        format: logging.format.map_or_else(LogFormat::infer, |format| match format {
            LogOutput::Json => LogFormat::Json,
            LogOutput::Pretty => LogFormat::Pretty,
        }),
        ..LoggingConfig::default()
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("serve");

    Box::pin(run_app_with(dependencies, shutdown_signal())).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies {
        config,
        telemetry,
        clock,
    } = dependencies;
    info!("colorization service bootstrap starting");

    let storage = TempStorage::new(&config.storage.root)
        .map_err(|err| AppError::storage("storage.new", err))?
        .with_output_dir(config.storage.output_dir.clone())
        .with_layout(config.storage.layout);
    storage
        .ensure_root()
        .await
        .map_err(|err| AppError::storage("storage.ensure_root", err))?;

    let schedule = CleanupSchedule::parse(&config.cleanup.schedule)
        .map_err(|err| AppError::cleanup("cleanup_schedule.parse", err))?;

    let command = WorkerCommand::new(config.worker.program.clone())
        .with_args(config.worker.args.iter().cloned());
    info!(
        worker = %command,
        timeout_secs = config.worker.timeout.as_ref().map(Duration::as_secs),
        "worker configured"
    );
    let worker = ProcessWorker::new(command).with_timeout(config.worker.timeout);

    let limits = PipelineLimits {
        max_upload_bytes: config.storage.max_upload_bytes,
        max_result_bytes: config.storage.max_result_bytes,
    };
    let pipeline = Arc::new(ColorizePipeline::new(
        storage.clone(),
        Arc::new(worker),
        limits,
        Arc::clone(&clock),
        telemetry.clone(),
    ));

    let cleanup = CleanupScheduler::new(
        storage.clone(),
        schedule,
        config.cleanup.retention,
        clock,
        telemetry.clone(),
    )
    .spawn();
    info!(
        schedule = %config.cleanup.schedule,
        retention_secs = config.cleanup.retention.as_secs(),
        "cleanup scheduler started"
    );

    let api = ApiServer::new(
        pipeline,
        telemetry,
        Some(cleanup.monitor()),
        limits.max_upload_bytes,
    );
    let addr = config.http.socket_addr();
    info!(
        addr = %addr,
        storage_root = %storage.root().display(),
        layout = storage.layout().as_str(),
        "launching api listener"
    );

    let serve_result = api.serve_with_shutdown(addr, shutdown).await;

    if let Err(err) = cleanup.shutdown().await {
        warn!(error = %err, "cleanup scheduler join failed");
    }

    match serve_result {
        Ok(()) => {
            info!("colorization service stopped");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "api server terminated");
            Err(AppError::api_server("api_server.serve", err))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for sigterm");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::net::{Ipv4Addr, TcpListener};
    use tempfile::TempDir;

    fn test_config(temp: &TempDir) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.http.bind_addr = Ipv4Addr::LOCALHOST.into();
        config.http.port = 0;
        config.storage.root = temp.path().join("tmp");
        config.worker.program = "true".to_string();
        config.worker.args = Vec::new();
        config
    }

    #[tokio::test]
    async fn serves_until_shutdown_and_prepares_storage() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let dependencies = BootstrapDependencies::with_config(test_config(&temp))?;

        run_app_with(dependencies, async {}).await?;
        assert!(temp.path().join("tmp").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_schedule_fails_before_serving() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let mut config = test_config(&temp);
        config.cleanup.schedule = "every night".to_string();

        let err = run_app_with(BootstrapDependencies::with_config(config)?, async {})
            .await
            .err();
        assert!(matches!(
            err,
            Some(AppError::Cleanup {
                operation: "cleanup_schedule.parse",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn occupied_port_is_reported() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let occupied = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let mut config = test_config(&temp);
        config.http.port = occupied.local_addr()?.port();

        let err = run_app_with(BootstrapDependencies::with_config(config)?, async {})
            .await
            .err();
        assert!(matches!(
            err,
            Some(AppError::ApiServer {
                source: recolor_api::ApiServerError::Bind { .. },
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn storage_root_must_be_a_directory() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let config = test_config(&temp);
        std::fs::write(&config.storage.root, b"not a directory")?;

        let err = run_app_with(BootstrapDependencies::with_config(config)?, async {})
            .await
            .err();
        assert!(matches!(
            err,
            Some(AppError::Storage {
                operation: "storage.ensure_root",
                ..
            })
        ));
        Ok(())
    }
}
