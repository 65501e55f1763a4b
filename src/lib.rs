//! Assessment completer - turns a collected tenant assessment package into a
//! finished output bundle of reports, recommendations, and deliverables.
//!
//! The entry point is [`CompletionPipeline`]; external collaborators plug in
//! through the traits in [`traits`].

pub mod collaborators;
pub mod complete;
pub mod config;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use complete::{CompletionError, CompletionPipeline, CompletionRequest};
pub use config::{CompletionConfig, Deliverable};
pub use model::{Advisory, AssessmentManifest, CompletionReport, ToolVersion};
