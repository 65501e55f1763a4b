//! Seams for the pipeline's external collaborators.
//!
//! The pipeline only knows these contracts; rendering, scoring, credential
//! minting and telemetry transport all live behind them. Concrete
//! implementations are in [`crate::collaborators`].

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::model::CompletionEvent;

/// Failure reported by a delegated collaborator (exporter or generator).
#[derive(Error, Debug)]
pub enum DelegateError {
    #[error("delegate reported failure: {0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure fetching a remote deliverable.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders report outputs from a directory of raw data artifacts.
///
/// Source and destination may be the same directory; the exporter owns its
/// retry policy and output naming.
#[async_trait]
pub trait ReportExporter: Send + Sync {
    async fn export(&self, source: &Path, destination: &Path) -> Result<(), DelegateError>;
}

/// Produces a recommendations artifact for an already-staged package.
#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    /// `skip_extraction` is always true from the pipeline: the archive was
    /// staged before this gate runs.
    async fn generate(
        &self,
        package_dir: &Path,
        interview: Option<&Path>,
        skip_extraction: bool,
    ) -> Result<(), DelegateError>;
}

/// Downloads a remote file to a local path with a plain GET.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError>;
}

/// Receives run completion events. Fire-and-forget: implementations must not
/// fail the run and should not block it.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &CompletionEvent);
}

/// Supplies an opaque access credential. The pipeline only asks whether one
/// is present; it never inspects or uses the credential itself.
pub trait CredentialProvider: Send + Sync {
    fn has_credential(&self) -> bool;
}
