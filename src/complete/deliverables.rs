//! Deliverable Stager: fetches auxiliary remote files into the output
//! directory and optionally replicates key artifacts into a shared working
//! directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::complete::CompletionError;
use crate::config::CompletionConfig;
use crate::model::Advisory;
use crate::traits::FileFetcher;

/// Fetches every configured deliverable concurrently.
///
/// The fetches are independent: a failure in one never cancels the others.
/// Each failure becomes a [`Advisory::DeliverableFetchFailed`] and the run is
/// reported as degraded, not aborted.
pub async fn stage_deliverables(
    fetcher: Arc<dyn FileFetcher>,
    config: &CompletionConfig,
    output_dir: &Path,
) -> Vec<Advisory> {
    let mut tasks = JoinSet::new();
    for deliverable in config.deliverables.clone() {
        let fetcher = Arc::clone(&fetcher);
        let destination = output_dir.join(&deliverable.filename);
        tasks.spawn(async move {
            match fetcher.fetch(&deliverable.url, &destination).await {
                Ok(()) => {
                    info!(
                        name = %deliverable.name,
                        destination = %destination.display(),
                        "deliverable staged"
                    );
                    None
                }
                Err(e) => Some(Advisory::DeliverableFetchFailed {
                    name: deliverable.name,
                    reason: e.to_string(),
                }),
            }
        });
    }

    let mut advisories = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(advisory)) => {
                warn!("{}", advisory);
                advisories.push(advisory);
            }
            Ok(None) => {}
            Err(e) => {
                let advisory = Advisory::DeliverableFetchFailed {
                    name: "deliverable".to_string(),
                    reason: format!("fetch task failed: {}", e),
                };
                warn!("{}", advisory);
                advisories.push(advisory);
            }
        }
    }
    advisories
}

/// Copies the tenant data directory's files and the replicable deliverables
/// into the shared working directory, overwriting same-named files.
pub fn replicate_to_shared(
    config: &CompletionConfig,
    output_dir: &Path,
    tenant_data_dir: &Path,
) -> Result<(), CompletionError> {
    fs::create_dir_all(&config.shared_dir)?;

    for entry in fs::read_dir(tenant_data_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::copy(entry.path(), config.shared_dir.join(entry.file_name()))?;
        }
    }

    for deliverable in &config.deliverables {
        if !deliverable.replicate_to_shared {
            continue;
        }
        let source = output_dir.join(&deliverable.filename);
        // A failed fetch already produced an advisory; nothing to replicate.
        if source.is_file() {
            fs::copy(&source, config.shared_dir.join(&deliverable.filename))?;
        }
    }

    info!(shared = %config.shared_dir.display(), "artifacts replicated to shared directory");
    Ok(())
}
