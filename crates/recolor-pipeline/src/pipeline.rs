//! End-to-end job orchestration.
//!
//! # Design
//! - Each job owns a fresh identifier; its span carries the id and the request id.
//! - Steps run strictly in order: prepare workspace, stage upload, run worker, read result.
//! - Retrieval is only attempted after the worker reported success.
//! - Staged files are left in place; the cleanup sweep owns their removal.

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use recolor_storage::{Clock, TempStorage};
use recolor_telemetry::{Metrics, current_request_id};
use recolor_worker::Worker;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::ingest::{Ingestor, StagedNameGenerator};
use crate::retrieve::Retriever;

/// Size limits applied to uploads and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Largest result read back, in bytes.
    pub max_result_bytes: u64,
}

/// Outcome of a successful job.
#[derive(Debug, Clone)]
pub struct ColorizedImage {
    /// Job identifier.
    pub job_id: Uuid,
    /// Staged upload path.
    pub source_path: PathBuf,
    /// Result path.
    pub result_path: PathBuf,
    /// MIME type of the result.
    pub content_type: &'static str,
    /// Result bytes.
    pub bytes: Vec<u8>,
    /// Time the worker ran for.
    pub worker_elapsed: Duration,
}

/// Runs colorization jobs against temporary storage and a worker.
pub struct ColorizePipeline {
    storage: TempStorage,
    worker: Arc<dyn Worker>,
    ingestor: Ingestor,
    retriever: Retriever,
    metrics: Metrics,
}

impl ColorizePipeline {
    /// Assemble a pipeline.
    #[must_use]
    pub fn new(
        storage: TempStorage,
        worker: Arc<dyn Worker>,
        limits: PipelineLimits,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            worker,
            ingestor: Ingestor::new(StagedNameGenerator::new(clock), limits.max_upload_bytes),
            retriever: Retriever::new(limits.max_result_bytes),
            metrics,
        }
    }

    /// Temporary storage the pipeline stages into.
    #[must_use]
    pub const fn storage(&self) -> &TempStorage {
        &self.storage
    }

    /// Colorize the image carried by `upload`.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] from whichever step failed; see
    /// [`PipelineError::kind`] for the externally visible category.
    pub async fn run<S, B, E>(
        &self,
        upload: S,
        original_filename: Option<&str>,
    ) -> PipelineResult<ColorizedImage>
    where
        S: Stream<Item = Result<B, E>> + Send,
        B: AsRef<[u8]> + Send,
        E: StdError + Send + Sync + 'static,
    {
        let job_id = Uuid::new_v4();
        let span = info_span!(
            "colorize.job",
            job_id = %job_id,
            request_id = current_request_id().as_deref().unwrap_or("-"),
        );
        let _in_flight = self.metrics.job_started();

        let outcome = self
            .execute(job_id, upload, original_filename)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match &outcome {
            Ok(image) => {
                self.metrics.job_succeeded(image.worker_elapsed);
                info!(
                    result = %image.result_path.display(),
                    size = image.bytes.len(),
                    worker_ms = u64::try_from(image.worker_elapsed.as_millis()).unwrap_or(u64::MAX),
                    "colorization completed"
                );
            }
            Err(err) => {
                let kind = err.kind();
                self.metrics.job_failed(kind.as_str());
                warn!(kind = kind.as_str(), error = %err, "colorization failed");
            }
        }
        outcome
    }

    async fn execute<S, B, E>(
        &self,
        job_id: Uuid,
        upload: S,
        original_filename: Option<&str>,
    ) -> PipelineResult<ColorizedImage>
    where
        S: Stream<Item = Result<B, E>> + Send,
        B: AsRef<[u8]> + Send,
        E: StdError + Send + Sync + 'static,
    {
        let workspace = self
            .storage
            .prepare_workspace(job_id)
            .await
            .map_err(|err| PipelineError::storage("storage.prepare_workspace", err))?;

        let staged = self
            .ingestor
            .stage(upload, original_filename, &workspace.input_dir)
            .await?;
        info!(path = %staged.path.display(), size = staged.size, "upload staged");

        let invocation = self
            .worker
            .invoke(&staged.path, &workspace.output_dir)
            .await?;

        let artifact = self
            .retriever
            .fetch(&invocation.input_path, &invocation.output_dir)
            .await?;

        Ok(ColorizedImage {
            job_id,
            source_path: staged.path,
            result_path: artifact.path,
            content_type: artifact.content_type,
            bytes: artifact.bytes,
            worker_elapsed: invocation.elapsed,
        })
    }
}
