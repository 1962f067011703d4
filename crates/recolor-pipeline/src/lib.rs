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

//! Colorization job pipeline: stage the upload, run the worker, read the result back.
//!
//! Layout: `ingest.rs` (upload staging), `retrieve.rs` (result lookup),
//! `extension.rs` (shared naming policy), `pipeline.rs` (orchestration), `error.rs`.

pub mod error;
pub mod extension;
pub mod ingest;
pub mod pipeline;
pub mod retrieve;

pub use error::{ErrorKind, PipelineError, PipelineResult, UploadRejection};
pub use ingest::{Ingestor, StagedNameGenerator, StagedUpload};
pub use pipeline::{ColorizePipeline, ColorizedImage, PipelineLimits};
pub use retrieve::{ResultArtifact, Retriever, content_type_for, expected_output_path};
