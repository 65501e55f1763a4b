//! Report and Recommendation Gates.
//!
//! The Report Gate runs the exporter only on a first completion pass (full
//! raw artifact set present) and then prunes the raw artifacts so a re-run of
//! the same extraction skips regeneration. The Recommendation Gate runs only
//! on explicit request and propagates failure.

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::complete::CompletionError;
use crate::model::{Advisory, Inspection};
use crate::traits::{RecommendationGenerator, ReportExporter};

/// Generates reports if this extraction still carries its full raw artifact
/// set; returns `true` when reports were generated.
///
/// Exporter failure is surfaced as an advisory and the raw artifacts are
/// kept, so a later run can retry the export. Prune failures are logged and
/// surfaced but never fatal.
pub async fn maybe_generate_reports(
    exporter: &dyn ReportExporter,
    inspection: &Inspection,
    advisories: &mut Vec<Advisory>,
) -> bool {
    if !inspection.is_fully_processed {
        debug!(
            artifacts = inspection.data_artifacts.len(),
            "skipping report generation, raw artifact set not complete"
        );
        return false;
    }

    let dir = &inspection.tenant_data_dir;
    if let Err(e) = exporter.export(dir, dir).await {
        let advisory = Advisory::ReportExportFailed {
            reason: e.to_string(),
        };
        warn!("{}", advisory);
        advisories.push(advisory);
        return false;
    }
    info!(directory = %dir.display(), "reports generated");

    prune_artifacts(inspection, advisories);
    true
}

/// Removes the consumed raw artifacts. Best-effort, but each failure is
/// logged so a broken idempotence signal stays diagnosable.
fn prune_artifacts(inspection: &Inspection, advisories: &mut Vec<Advisory>) {
    for artifact in &inspection.data_artifacts {
        if let Err(e) = fs::remove_file(artifact) {
            let advisory = Advisory::ArtifactPruneFailed {
                path: artifact.clone(),
                reason: e.to_string(),
            };
            warn!("{}", advisory);
            advisories.push(advisory);
        }
    }
}

/// Runs the recommendation generator against the staged package.
///
/// Failure is fatal: the caller explicitly asked for the artifact, so a
/// silent miss would be a correctness bug.
pub async fn generate_recommendations(
    generator: &dyn RecommendationGenerator,
    output_dir: &Path,
    interview: Option<&Path>,
) -> Result<(), CompletionError> {
    generator.generate(output_dir, interview, true).await?;
    info!(directory = %output_dir.display(), "recommendations generated");
    Ok(())
}
