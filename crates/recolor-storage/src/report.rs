//! Accounting for tree deletion and sweeps.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// An entry that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    /// Entry that survived.
    pub path: PathBuf,
    /// Rendered IO error.
    pub error: String,
}

/// Outcome of deleting everything beneath a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Entries removed (files, links and directories).
    pub removed: usize,
    /// Entries that could not be removed.
    pub failures: Vec<DeleteFailure>,
}

impl DeleteReport {
    /// Whether every entry was removed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_failure(&mut self, path: &Path, error: &io::Error) {
        warn!(path = %path.display(), error = %error, "failed to delete entry; continuing");
        self.failures.push(DeleteFailure {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }

    pub(crate) fn absorb(&mut self, other: Self) {
        self.removed += other.removed;
        self.failures.extend(other.failures);
    }
}

/// Outcome of a retention sweep over the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Root that was swept.
    pub root: PathBuf,
    /// Instant the sweep measured ages against.
    pub swept_at: DateTime<Utc>,
    /// Top-level entries inspected.
    pub examined: usize,
    /// Top-level entries left in place because they were newer than the retention window.
    pub retained: usize,
    /// Deletion accounting across every removed entry.
    pub deleted: DeleteReport,
}

impl SweepReport {
    pub(crate) fn new(root: &Path, swept_at: DateTime<Utc>) -> Self {
        Self {
            root: root.to_path_buf(),
            swept_at,
            examined: 0,
            retained: 0,
            deleted: DeleteReport::default(),
        }
    }

    /// Number of entries removed, including nested ones.
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.deleted.removed
    }

    /// Number of entries that could not be removed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.deleted.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_merges_counts_and_failures() {
        let mut outer = DeleteReport {
            removed: 2,
            failures: Vec::new(),
        };
        let mut inner = DeleteReport {
            removed: 3,
            failures: Vec::new(),
        };
        inner.record_failure(Path::new("locked"), &io::Error::other("denied"));

        outer.absorb(inner);
        assert_eq!(outer.removed, 5);
        assert!(!outer.is_clean());
        assert_eq!(outer.failures[0].path, PathBuf::from("locked"));
        assert_eq!(outer.failures[0].error, "denied");
    }
}
