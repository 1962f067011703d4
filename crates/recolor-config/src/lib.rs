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

//! Service configuration for the Recolor workspace.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment parsing),
//! `defaults.rs` (fallback values), `error.rs` (validation failures).

pub mod defaults;
pub mod error;
mod loader;
pub mod model;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    CleanupSettings, HttpSettings, LogOutput, LoggingSettings, ServiceConfig, StagingLayout,
    StorageSettings, WorkerSettings,
};
