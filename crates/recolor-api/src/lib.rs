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

//! HTTP surface for the colorization service.
//!
//! Layout: `http/router.rs` (server and middleware), `http/colorize.rs` (upload endpoint),
//! `http/health.rs` (health and metrics), `http/errors.rs` (problem responses),
//! `models.rs` (wire types), `state.rs`, `error.rs`.

pub mod error;
pub(crate) mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
pub use models::{ColorizeResponse, ProblemDetails};
