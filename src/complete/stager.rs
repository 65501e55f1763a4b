//! Archive Stager: deterministic, idempotent-by-replacement extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::complete::CompletionError;

/// Output directory for a package: the package file stem under `output_root`.
pub fn staged_dir(package_path: &Path, output_root: &Path) -> Result<PathBuf, CompletionError> {
    let stem = package_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CompletionError::PackageUnreadable {
            path: package_path.to_path_buf(),
            reason: "package path has no usable file name".to_string(),
        })?;
    Ok(output_root.join(stem))
}

/// Extracts `package_path` into its deterministic directory under
/// `output_root`, replacing any prior extraction wholesale.
///
/// A pre-existing output directory is removed first; a failed removal is
/// fatal so a stale partial tree is never silently merged into. Archive
/// entries that would escape the output directory are rejected.
pub fn stage(package_path: &Path, output_root: &Path) -> Result<PathBuf, CompletionError> {
    if !package_path.is_file() {
        return Err(CompletionError::PackageUnreadable {
            path: package_path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    let output_dir = staged_dir(package_path, output_root)?;
    if output_dir.exists() {
        debug!(path = %output_dir.display(), "removing stale extraction");
        fs::remove_dir_all(&output_dir)?;
    }
    fs::create_dir_all(&output_dir)?;

    let file = fs::File::open(package_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| CompletionError::PackageUnreadable {
            path: package_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| CompletionError::PackageUnreadable {
                path: package_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        // Path traversal guard: enclosed_name rejects `..` and absolute entries.
        let Some(relative) = entry.enclosed_name() else {
            return Err(CompletionError::PackageUnreadable {
                path: package_path.to_path_buf(),
                reason: format!("archive entry '{}' escapes the output directory", entry.name()),
            });
        };
        let target = output_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }
    }

    info!(
        package = %package_path.display(),
        output = %output_dir.display(),
        entries = archive.len(),
        "package staged"
    );
    Ok(output_dir)
}
