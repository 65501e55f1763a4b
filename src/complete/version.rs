//! Version Reconciler: advisory-only comparison of producer and consumer
//! toolset versions. Never fails and never blocks a stage.

use crate::model::{Advisory, ToolVersion};

/// Compares the package producer's version against the running toolset's.
///
/// Priority order: a non-canonical producer wins over a non-canonical
/// toolset, which wins over a plain mismatch. At most one advisory is
/// returned; equal canonical versions return none.
pub fn reconcile(package: &ToolVersion, toolset: &ToolVersion) -> Vec<Advisory> {
    match (package, toolset) {
        (ToolVersion::NonCanonical, _) => vec![Advisory::ProducerNotCanonical],
        (_, ToolVersion::NonCanonical) => vec![Advisory::ToolsetNotCanonical],
        (ToolVersion::Canonical(p), ToolVersion::Canonical(t)) if p != t => {
            vec![Advisory::VersionMismatch {
                package: p.to_string(),
                toolset: t.to_string(),
            }]
        }
        _ => Vec::new(),
    }
}
