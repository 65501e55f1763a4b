//! Package completion pipeline.
//!
//! The ordered stages that turn a collected package archive into a finished
//! output bundle:
//! - [`stager`]: re-extract the archive into a deterministic directory
//! - [`inspector`]: read the manifest and census the raw data artifacts
//! - [`version`]: advisory reconciliation of producer/consumer versions
//! - [`gates`]: conditional report and recommendation generation
//! - [`deliverables`]: fetch and stage auxiliary files
//! - [`pipeline`]: the orchestrator tying the stages together

pub mod deliverables;
pub mod gates;
pub mod inspector;
pub mod pipeline;
pub mod stager;
pub mod version;

pub use pipeline::{CompletionPipeline, CompletionRequest};

use std::path::PathBuf;
use thiserror::Error;

use crate::traits::DelegateError;

/// Fatal conditions that abort a run.
///
/// Non-fatal conditions are [`crate::model::Advisory`], not errors.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// Archive missing, unreadable, or not a valid container.
    #[error("package unreadable at '{path}': {reason}")]
    PackageUnreadable { path: PathBuf, reason: String },

    /// Manifest missing or unparseable after extraction.
    #[error("assessment manifest missing or invalid: {0}")]
    ManifestInvalid(String),

    /// Zero or multiple tenant data directories found where exactly one was
    /// expected.
    #[error("expected exactly one tenant data directory, found {found}")]
    TenantDirectoryMissing { found: usize },

    /// The recommendation generator failed after being explicitly requested.
    #[error("recommendation generation failed: {0}")]
    Recommendations(#[from] DelegateError),

    /// Filesystem failure in a stage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
