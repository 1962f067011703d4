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

//! Scheduled sweeps of temporary storage.
//!
//! Layout: `schedule.rs` (five-field cron expressions), `scheduler.rs` (background task,
//! handle and monitor), `error.rs`.

pub mod error;
pub mod schedule;
pub mod scheduler;

pub use error::{CleanupError, CleanupResult};
pub use schedule::CleanupSchedule;
pub use scheduler::{CleanupHandle, CleanupMonitor, CleanupScheduler, SchedulerState, SweepSummary};
