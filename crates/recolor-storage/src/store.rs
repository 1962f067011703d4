//! Ownership of the temporary storage root.
//!
//! # Design
//! - The root is resolved to an absolute path once, so every staged path is absolute.
//! - Job workspaces follow the configured [`StagingLayout`].
//! - Sweeps only touch entries older than the retention window; the root always survives.
//! - With a retention window the shared output directory is swept per entry and removed
//!   once it is stale and empty. A zero retention removes it like any other entry.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeDelta, Utc};
use recolor_config::StagingLayout;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::fs::{delete_tree_blocking, ensure_dir};
use crate::report::SweepReport;

const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Input and output directories for a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobWorkspace {
    /// Identifier of the job owning the workspace.
    pub job_id: Uuid,
    /// Directory the upload is staged into.
    pub input_dir: PathBuf,
    /// Directory handed to the worker for its output.
    pub output_dir: PathBuf,
}

/// Handle to the temporary storage root.
#[derive(Debug, Clone)]
pub struct TempStorage {
    root: PathBuf,
    output_dir: String,
    layout: StagingLayout,
}

impl TempStorage {
    /// Resolve `root` against the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when `root` is empty or the working directory is unavailable.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref();
        let root =
            std::path::absolute(root).map_err(|err| StorageError::io("storage.resolve", root, err))?;
        Ok(Self {
            root,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            layout: StagingLayout::default(),
        })
    }

    /// Override the output directory name.
    #[must_use]
    pub fn with_output_dir(mut self, name: impl Into<String>) -> Self {
        self.output_dir = name.into();
        self
    }

    /// Override the staging layout.
    #[must_use]
    pub const fn with_layout(mut self, layout: StagingLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Absolute storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the output directory inside a staging directory.
    #[must_use]
    pub fn output_dir_name(&self) -> &str {
        &self.output_dir
    }

    /// Active staging layout.
    #[must_use]
    pub const fn layout(&self) -> StagingLayout {
        self.layout
    }

    /// Create the storage root if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Propagates [`ensure_dir`] failures.
    pub async fn ensure_root(&self) -> StorageResult<()> {
        ensure_dir(&self.root).await
    }

    /// Resolve the workspace for `job_id` without touching the filesystem.
    #[must_use]
    pub fn workspace(&self, job_id: Uuid) -> JobWorkspace {
        let input_dir = match self.layout {
            StagingLayout::PerJob => self.root.join(job_id.to_string()),
            StagingLayout::Shared => self.root.clone(),
        };
        let output_dir = input_dir.join(&self.output_dir);
        JobWorkspace {
            job_id,
            input_dir,
            output_dir,
        }
    }

    /// Resolve the workspace for `job_id` and create its input directory.
    ///
    /// # Errors
    ///
    /// Propagates [`ensure_dir`] failures.
    pub async fn prepare_workspace(&self, job_id: Uuid) -> StorageResult<JobWorkspace> {
        let workspace = self.workspace(job_id);
        ensure_dir(&workspace.input_dir).await?;
        Ok(workspace)
    }

    /// Remove every top-level entry last modified at or before `now - retention`.
    ///
    /// A zero `retention` removes everything. A missing root is an empty sweep.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the root cannot be listed and
    /// [`StorageError::Join`] if the blocking sweep panics.
    pub async fn sweep(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> StorageResult<SweepReport> {
        let root = self.root.clone();
        let output_dir = self.output_dir.clone();
        let report = tokio::task::spawn_blocking(move || {
            let mut report = SweepReport::new(&root, now);
            let cutoff = (!retention.is_zero()).then(|| {
                TimeDelta::from_std(retention)
                    .ok()
                    .and_then(|window| now.checked_sub_signed(window))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC)
            });
            match std::fs::metadata(&root) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(root = %root.display(), "storage root missing; nothing to sweep");
                }
                _ => sweep_entries(&root, Some(&output_dir), cutoff, &mut report)?,
            }
            Ok(report)
        })
        .await
        .map_err(|err| StorageError::join("sweep", err))??;

        info!(
            root = %report.root.display(),
            examined = report.examined,
            retained = report.retained,
            removed = report.removed(),
            failed = report.failed(),
            "storage sweep finished"
        );
        Ok(report)
    }
}

fn sweep_entries(
    dir: &Path,
    output_dir: Option<&str>,
    cutoff: Option<DateTime<Utc>>,
    report: &mut SweepReport,
) -> StorageResult<()> {
    let entries =
        std::fs::read_dir(dir).map_err(|err| StorageError::io("sweep.read_dir", dir, err))?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                report.deleted.record_failure(dir, &err);
                continue;
            }
        };
        let path = entry.path();
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                report.deleted.record_failure(&path, &err);
                continue;
            }
        };

        report.examined += 1;
        if let Some(cutoff) = cutoff {
            if metadata.is_dir() && output_dir.is_some_and(|name| entry.file_name() == name) {
                sweep_entries(&path, None, Some(cutoff), report)?;
                remove_if_stale_and_empty(&path, cutoff, report);
                continue;
            }
            if modified_at(&metadata) > cutoff {
                report.retained += 1;
                continue;
            }
        }

        let removal = if metadata.is_dir() {
            report.deleted.absorb(delete_tree_blocking(&path));
            std::fs::remove_dir(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match removal {
            Ok(()) => report.deleted.removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => report.deleted.record_failure(&path, &err),
        }
    }
    Ok(())
}

fn modified_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    DateTime::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}

/// Remove a shared output directory once nothing fresh is left in it.
fn remove_if_stale_and_empty(dir: &Path, cutoff: DateTime<Utc>, report: &mut SweepReport) {
    let stale = std::fs::metadata(dir).is_ok_and(|metadata| modified_at(&metadata) <= cutoff);
    let empty = std::fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
    if !stale || !empty {
        report.retained += 1;
        return;
    }
    match std::fs::remove_dir(dir) {
        Ok(()) => report.deleted.removed += 1,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => report.deleted.record_failure(dir, &err),
    }
}
