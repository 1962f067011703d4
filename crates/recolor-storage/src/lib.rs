#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Temporary storage for staged uploads and worker outputs.
//!
//! Layout: `fs.rs` (directory primitives), `store.rs` (root ownership, workspaces, sweeps),
//! `report.rs` (deletion accounting), `clock.rs` (time source).

pub mod clock;
pub mod error;
pub mod fs;
pub mod report;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use fs::{delete_tree, ensure_dir};
pub use recolor_config::StagingLayout;
pub use report::{DeleteFailure, DeleteReport, SweepReport};
pub use store::{JobWorkspace, TempStorage};
