//! Default implementations of the collaborator seams.
//!
//! The HTTP fetcher is the only collaborator this crate fully owns. Report
//! export and recommendation generation are external tools, wired in as
//! configured commands; telemetry defaults to structured log events.

use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

use crate::model::CompletionEvent;
use crate::traits::{
    CredentialProvider, DelegateError, FetchError, FileFetcher, RecommendationGenerator,
    ReportExporter, TelemetrySink,
};

/// Plain-GET downloader backed by `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        tokio::fs::write(destination, &body).await?;
        Ok(())
    }
}

/// Runs a configured external command as the report exporter.
///
/// The command receives the source and destination directories as its two
/// arguments. With no command configured, export fails and the pipeline
/// surfaces it as an advisory.
pub struct CommandExporter {
    command: Option<String>,
}

impl CommandExporter {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ReportExporter for CommandExporter {
    async fn export(&self, source: &Path, destination: &Path) -> Result<(), DelegateError> {
        let Some(command) = &self.command else {
            return Err(DelegateError::Failed(
                "no report exporter command configured".to_string(),
            ));
        };
        run_delegate(command, &[source, destination], &[]).await
    }
}

/// Runs a configured external command as the recommendation generator.
pub struct CommandRecommender {
    command: Option<String>,
}

impl CommandRecommender {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl RecommendationGenerator for CommandRecommender {
    async fn generate(
        &self,
        package_dir: &Path,
        interview: Option<&Path>,
        skip_extraction: bool,
    ) -> Result<(), DelegateError> {
        let Some(command) = &self.command else {
            return Err(DelegateError::Failed(
                "no recommendation generator command configured".to_string(),
            ));
        };
        let mut flags: Vec<String> = Vec::new();
        if skip_extraction {
            flags.push("--skip-extraction".to_string());
        }
        if let Some(interview) = interview {
            flags.push("--interview".to_string());
            flags.push(interview.display().to_string());
        }
        run_delegate(command, &[package_dir], &flags).await
    }
}

async fn run_delegate(
    command: &str,
    paths: &[&Path],
    flags: &[String],
) -> Result<(), DelegateError> {
    let mut cmd = tokio::process::Command::new(command);
    for p in paths {
        cmd.arg(p);
    }
    cmd.args(flags);
    let status = cmd.status().await?;
    if status.success() {
        Ok(())
    } else {
        Err(DelegateError::Failed(format!(
            "'{}' exited with {}",
            command, status
        )))
    }
}

/// Telemetry sink that emits structured log events.
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: &CompletionEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(target: "telemetry", %payload, "completion event"),
            Err(e) => warn!("failed to serialize completion event: {}", e),
        }
    }
}

/// Telemetry sink that drops everything.
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: &CompletionEvent) {}
}

/// Reports a credential as present when the given environment variable is
/// set and non-empty.
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new("ASSESSMENT_ACCESS_TOKEN")
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn has_credential(&self) -> bool {
        std::env::var(&self.var)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }
}
