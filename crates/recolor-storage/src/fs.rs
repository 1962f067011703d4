//! Directory primitives shared by ingestion, the worker and the sweep.
//!
//! # Design
//! - `ensure_dir` is idempotent and refuses to treat a file as a directory.
//! - `delete_tree` empties a directory depth-first and keeps the directory itself.
//! - A missing entry counts as deleted; other failures are recorded and the walk continues.

use std::io;
use std::path::Path;

use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};
use crate::report::DeleteReport;

/// Create `path` and any missing parents.
///
/// # Errors
///
/// Returns [`StorageError::NotADirectory`] when `path` exists as a non-directory and
/// [`StorageError::Io`] when the directory cannot be inspected or created.
pub async fn ensure_dir(path: &Path) -> StorageResult<()> {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(StorageError::io("ensure_dir.metadata", path, err)),
    }

    fs::create_dir_all(path)
        .await
        .map_err(|err| StorageError::io("ensure_dir.create", path, err))?;
    debug!(path = %path.display(), "created directory");
    Ok(())
}

/// Remove every entry beneath `path`, leaving `path` in place.
///
/// # Errors
///
/// Returns [`StorageError::Join`] only if the blocking walk panics; per-entry
/// failures are reported through [`DeleteReport::failures`].
pub async fn delete_tree(path: &Path) -> StorageResult<DeleteReport> {
    let root = path.to_path_buf();
    tokio::task::spawn_blocking(move || delete_tree_blocking(&root))
        .await
        .map_err(|err| StorageError::join("delete_tree", err))
}

pub(crate) fn delete_tree_blocking(root: &Path) -> DeleteReport {
    let mut report = DeleteReport::default();

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                let error = io::Error::from(err);
                if error.kind() != io::ErrorKind::NotFound {
                    report.record_failure(&path, &error);
                }
                continue;
            }
        };

        let path = entry.path();
        let removal = if entry.file_type().is_dir() {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        };

        match removal {
            Ok(()) => report.removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => report.record_failure(path, &err),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tempfile::TempDir;

    #[tokio::test]
    async fn ensure_dir_is_idempotent() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let nested = temp.path().join("a").join("b");
        ensure_dir(&nested).await?;
        ensure_dir(&nested).await?;
        assert!(nested.is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn ensure_dir_rejects_existing_file() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"x")?;

        let err = ensure_dir(&file).await.err();
        assert!(matches!(err, Some(StorageError::NotADirectory { ref path }) if path == &file));
        Ok(())
    }

    #[tokio::test]
    async fn delete_tree_empties_directory_and_keeps_root() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let root = temp.path();
        std::fs::create_dir_all(root.join("generated").join("deep"))?;
        std::fs::write(root.join("1700000000000.jpg"), b"in")?;
        std::fs::write(root.join("generated").join("1700000000000.jpg"), b"out")?;
        std::fs::write(root.join("generated").join("deep").join("x"), b"x")?;

        let report = delete_tree(root).await?;
        assert!(report.is_clean());
        assert_eq!(report.removed, 5);
        assert!(root.is_dir());
        assert_eq!(std::fs::read_dir(root)?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn delete_tree_on_missing_root_is_a_noop() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let report = delete_tree(&temp.path().join("missing")).await?;
        assert_eq!(report, DeleteReport::default());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn delete_tree_continues_past_failures() -> Result<(), Box<dyn Error>> {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new()?;
        let root = temp.path();
        let locked = root.join("locked");
        std::fs::create_dir(&locked)?;
        std::fs::write(locked.join("kept"), b"x")?;
        std::fs::write(root.join("loose"), b"x")?;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555))?;

        let report = delete_tree(root).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))?;
        let report = report?;

        assert!(!root.join("loose").exists());
        // Privileged runners can delete through read-only directories.
        if locked.join("kept").exists() {
            assert!(!report.is_clean());
            assert!(report.failures.iter().any(|failure| failure.path == locked.join("kept")));
        }
        Ok(())
    }
}
