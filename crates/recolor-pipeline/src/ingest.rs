//! Upload staging.
//!
//! # Design
//! - Names are millisecond timestamps made strictly increasing per process, plus the
//!   upload's extension; files are opened create-new so an existing file is never replaced.
//! - The stream is copied chunk by chunk with a byte limit; nothing is buffered whole.
//! - Any failure removes the partial file before returning.

use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_core::Stream;
use futures_util::StreamExt;
use recolor_storage::Clock;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult, UploadRejection};
use crate::extension::extension_for_upload;

const MAX_NAME_ATTEMPTS: usize = 32;

/// A file written to temporary storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// Absolute path of the staged file.
    pub path: PathBuf,
    /// Dotted extension, e.g. `.png`.
    pub extension: String,
    /// Bytes written.
    pub size: u64,
}

/// Generates strictly increasing millisecond names.
pub struct StagedNameGenerator {
    clock: Arc<dyn Clock>,
    last: AtomicU64,
}

impl StagedNameGenerator {
    /// Generator reading wall-clock time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicU64::new(0),
        }
    }

    /// Next name: the current millisecond, or one past the previous name if the clock
    /// has not advanced.
    pub fn next(&self) -> u64 {
        let now = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }
}

/// Writes inbound upload streams into a staging directory.
pub struct Ingestor {
    names: StagedNameGenerator,
    max_bytes: u64,
}

impl Ingestor {
    /// Ingestor that accepts uploads up to `max_bytes`.
    #[must_use]
    pub const fn new(names: StagedNameGenerator, max_bytes: u64) -> Self {
        Self { names, max_bytes }
    }

    /// Copy `stream` into `dest_dir` under a fresh name.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Upload`] for empty or oversized uploads,
    /// [`PipelineError::UploadStream`] when the stream yields an error and
    /// [`PipelineError::UploadWrite`] when the file cannot be created or written.
    pub async fn stage<S, B, E>(
        &self,
        stream: S,
        original_filename: Option<&str>,
        dest_dir: &Path,
    ) -> PipelineResult<StagedUpload>
    where
        S: Stream<Item = Result<B, E>> + Send,
        B: AsRef<[u8]> + Send,
        E: StdError + Send + Sync + 'static,
    {
        let extension = extension_for_upload(original_filename);
        let (path, mut file) = self.create_unique(dest_dir, &extension).await?;

        let written = self.copy(stream, &mut file, &path).await;
        let written = match written {
            Ok(0) => Err(PipelineError::rejected(UploadRejection::EmptyStream)),
            other => other,
        };
        match written {
            Ok(size) => {
                debug!(path = %path.display(), size, "upload staged");
                Ok(StagedUpload {
                    path,
                    extension,
                    size,
                })
            }
            Err(err) => {
                drop(file);
                discard(&path).await;
                Err(err)
            }
        }
    }

    async fn create_unique(&self, dest_dir: &Path, extension: &str) -> PipelineResult<(PathBuf, File)> {
        let mut last_error = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = dest_dir.join(format!("{}{extension}", self.names.next()));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "staged name taken; retrying");
                    last_error = Some(err);
                }
                Err(err) => return Err(PipelineError::upload_write("ingest.create", path, err)),
            }
        }
        Err(PipelineError::upload_write(
            "ingest.create",
            dest_dir,
            last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)),
        ))
    }

    async fn copy<S, B, E>(&self, stream: S, file: &mut File, path: &Path) -> PipelineResult<u64>
    where
        S: Stream<Item = Result<B, E>> + Send,
        B: AsRef<[u8]> + Send,
        E: StdError + Send + Sync + 'static,
    {
        let mut stream = pin!(stream);
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| PipelineError::UploadStream {
                source: Box::new(err),
            })?;
            let bytes = chunk.as_ref();
            written = written.saturating_add(u64::try_from(bytes.len()).unwrap_or(u64::MAX));
            if written > self.max_bytes {
                return Err(PipelineError::rejected(UploadRejection::TooLarge {
                    limit: self.max_bytes,
                }));
            }
            file.write_all(bytes)
                .await
                .map_err(|err| PipelineError::upload_write("ingest.write", path, err))?;
        }
        file.flush()
            .await
            .map_err(|err| PipelineError::upload_write("ingest.flush", path, err))?;
        Ok(written)
    }
}

async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove partial upload"),
    }
}
