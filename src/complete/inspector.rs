//! Package Inspector: manifest load, tenant directory resolution, artifact
//! census.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::complete::CompletionError;
use crate::config::CompletionConfig;
use crate::model::{Advisory, AssessmentManifest, Inspection};

/// Inspects an extracted package directory.
///
/// Fails on a missing or unparseable manifest and on anything other than
/// exactly one tenant-prefixed subdirectory. An unexpected artifact count
/// (neither zero nor the expected count) is returned as an advisory, not an
/// error.
pub fn inspect(
    output_dir: &Path,
    config: &CompletionConfig,
) -> Result<(Inspection, Vec<Advisory>), CompletionError> {
    let manifest = load_manifest(&output_dir.join(&config.manifest_filename))?;
    let tenant_data_dir = resolve_tenant_dir(output_dir, &config.tenant_dir_prefix)?;
    let data_artifacts = census_artifacts(&tenant_data_dir, &config.data_artifact_suffix)?;

    let count = data_artifacts.len();
    let is_fully_processed = count == config.expected_artifact_count;

    let mut advisories = Vec::new();
    if count != 0 && !is_fully_processed {
        let advisory = Advisory::IncompleteCollection {
            found: count,
            expected: config.expected_artifact_count,
        };
        warn!("{}", advisory);
        advisories.push(advisory);
    }

    debug!(
        tenant = %manifest.tenant_domain,
        artifacts = count,
        fully_processed = is_fully_processed,
        "package inspected"
    );

    Ok((
        Inspection {
            manifest,
            tenant_data_dir,
            data_artifacts,
            is_fully_processed,
        },
        advisories,
    ))
}

fn load_manifest(path: &Path) -> Result<AssessmentManifest, CompletionError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        CompletionError::ManifestInvalid(format!("cannot read '{}': {}", path.display(), e))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| CompletionError::ManifestInvalid(format!("cannot parse manifest: {}", e)))
}

fn resolve_tenant_dir(output_dir: &Path, prefix: &str) -> Result<PathBuf, CompletionError> {
    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            matches.push(entry.path());
        }
    }
    if matches.len() != 1 {
        return Err(CompletionError::TenantDirectoryMissing {
            found: matches.len(),
        });
    }
    Ok(matches.remove(0))
}

fn census_artifacts(tenant_dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, CompletionError> {
    let mut artifacts: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(tenant_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            artifacts.push(entry.path());
        }
    }
    artifacts.sort();
    Ok(artifacts)
}
