//! Pipeline Orchestrator.
//!
//! Sequences the completion stages along a single forward path:
//! Stage → Inspect → Reconcile (advisory) → ReportGate →
//! RecommendationGate (optional) → DeliverableStager → Complete.
//!
//! A fatal error aborts the remaining stages and is re-raised after a
//! best-effort telemetry record; the output directory is left exactly as the
//! stages left it. Only the next staging pass (a fresh extraction) resets it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::complete::{deliverables, gates, inspector, stager, version, CompletionError};
use crate::config::CompletionConfig;
use crate::model::{
    Advisory, AssessmentManifest, CompletionEvent, CompletionReport, ToolVersion,
};
use crate::traits::{
    CredentialProvider, FileFetcher, RecommendationGenerator, ReportExporter, TelemetrySink,
};

/// Parameters for one completion run.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Path to the package archive.
    pub package_path: PathBuf,

    /// Generate a recommendations artifact.
    pub include_recommendations: bool,

    /// Optional interview input forwarded to the recommendation generator.
    pub interview_path: Option<PathBuf>,

    /// Replicate key artifacts into the shared working directory.
    pub stage_to_shared_dir: bool,
}

impl CompletionRequest {
    pub fn new(package_path: PathBuf) -> Self {
        Self {
            package_path,
            include_recommendations: false,
            interview_path: None,
            stage_to_shared_dir: true,
        }
    }
}

/// Coordinates one package completion run.
///
/// Owns the configuration and the collaborator seams for the duration of a
/// run; no state is retained across invocations.
pub struct CompletionPipeline {
    config: CompletionConfig,
    exporter: Arc<dyn ReportExporter>,
    recommender: Arc<dyn RecommendationGenerator>,
    fetcher: Arc<dyn FileFetcher>,
    telemetry: Arc<dyn TelemetrySink>,
    credentials: Arc<dyn CredentialProvider>,
}

impl CompletionPipeline {
    pub fn new(
        config: CompletionConfig,
        exporter: Arc<dyn ReportExporter>,
        recommender: Arc<dyn RecommendationGenerator>,
        fetcher: Arc<dyn FileFetcher>,
    ) -> Self {
        Self {
            config,
            exporter,
            recommender,
            fetcher,
            telemetry: Arc::new(crate::collaborators::NoopTelemetry),
            credentials: Arc::new(crate::collaborators::EnvCredentialProvider::default()),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Runs the full completion pipeline for one package.
    ///
    /// Always records a completion telemetry event, on success and on
    /// failure alike.
    pub async fn run(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionReport, CompletionError> {
        let started = Instant::now();
        let mut manifest: Option<AssessmentManifest> = None;

        let result = self.run_stages(&request, &mut manifest).await;

        let event = CompletionEvent {
            assessment_id: manifest.as_ref().map(|m| m.assessment_id.clone()),
            tenant_id: manifest.as_ref().map(|m| m.tenant_id.clone()),
            success: result.is_ok(),
            duration_ms: started.elapsed().as_millis() as u64,
            credential_present: self.credentials.has_credential(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        self.telemetry.record(&event);

        result
    }

    async fn run_stages(
        &self,
        request: &CompletionRequest,
        manifest_out: &mut Option<AssessmentManifest>,
    ) -> Result<CompletionReport, CompletionError> {
        let mut advisories: Vec<Advisory> = Vec::new();

        checkpoint("stage", 10);
        let package_path = request.package_path.clone();
        let output_root = self.config.output_root.clone();
        let output_dir =
            tokio::task::spawn_blocking(move || stager::stage(&package_path, &output_root))
                .await
                .map_err(join_failure)??;

        checkpoint("inspect", 30);
        let config = self.config.clone();
        let inspect_dir = output_dir.clone();
        let (inspection, inspect_advisories) =
            tokio::task::spawn_blocking(move || inspector::inspect(&inspect_dir, &config))
                .await
                .map_err(join_failure)??;
        advisories.extend(inspect_advisories);
        *manifest_out = Some(inspection.manifest.clone());

        checkpoint("reconcile", 40);
        let package_version = ToolVersion::parse(&inspection.manifest.assessment_version);
        for advisory in version::reconcile(&package_version, &self.config.toolset_version) {
            warn!("{}", advisory);
            advisories.push(advisory);
        }

        checkpoint("reports", 55);
        let reports_generated =
            gates::maybe_generate_reports(self.exporter.as_ref(), &inspection, &mut advisories)
                .await;

        let mut recommendations_generated = false;
        if request.include_recommendations {
            checkpoint("recommendations", 70);
            gates::generate_recommendations(
                self.recommender.as_ref(),
                &output_dir,
                request.interview_path.as_deref(),
            )
            .await?;
            recommendations_generated = true;
        }

        checkpoint("deliverables", 85);
        advisories.extend(
            deliverables::stage_deliverables(
                Arc::clone(&self.fetcher),
                &self.config,
                &output_dir,
            )
            .await,
        );

        if request.stage_to_shared_dir {
            let config = self.config.clone();
            let out = output_dir.clone();
            let tenant = inspection.tenant_data_dir.clone();
            tokio::task::spawn_blocking(move || {
                deliverables::replicate_to_shared(&config, &out, &tenant)
            })
            .await
            .map_err(join_failure)??;
        }

        checkpoint("complete", 100);
        let report = CompletionReport {
            output_dir,
            manifest: inspection.manifest,
            advisories,
            reports_generated,
            recommendations_generated,
        };
        info!(
            output = %report.output_dir.display(),
            degraded = report.is_degraded(),
            advisories = report.advisories.len(),
            "package completion finished"
        );
        Ok(report)
    }
}

/// Progress checkpoints are observational only, never a control signal.
fn checkpoint(stage: &'static str, percent: u8) {
    info!(stage, percent, "pipeline checkpoint");
}

fn join_failure(e: tokio::task::JoinError) -> CompletionError {
    CompletionError::Io(std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Deliverable;
    use crate::traits::{DelegateError, FetchError};
    use async_trait::async_trait;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use zip::write::SimpleFileOptions;

    const MANIFEST: &str = r#"{
        "AssessmentId": "a-1",
        "AssessmentVersion": "1.2.0.0",
        "AssessmentTenantId": "t-1",
        "AssessmentTenantDomain": "contoso.example"
    }"#;

    fn write_package(dir: &Path, with_manifest: bool, data_files: usize) -> PathBuf {
        let path = dir.join("AzureADAssessmentData-contoso.zip");
        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        if with_manifest {
            writer.start_file("AzureADAssessment.json", options).unwrap();
            writer.write_all(MANIFEST.as_bytes()).unwrap();
        }
        for i in 0..data_files {
            writer
                .start_file(
                    format!("AAD-contoso.example/Category{}Data.xml", i),
                    options,
                )
                .unwrap();
            writer.write_all(b"<xml/>").unwrap();
        }
        writer.finish().unwrap();
        path
    }

    struct OkExporter;

    #[async_trait]
    impl ReportExporter for OkExporter {
        async fn export(&self, source: &Path, _dest: &Path) -> Result<(), DelegateError> {
            fs::write(source.join("Report.html"), "<html/>")?;
            Ok(())
        }
    }

    struct OkRecommender {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecommendationGenerator for OkRecommender {
        async fn generate(
            &self,
            package_dir: &Path,
            _interview: Option<&Path>,
            skip_extraction: bool,
        ) -> Result<(), DelegateError> {
            assert!(skip_extraction);
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(package_dir.join("Recommendations.json"), "{}")?;
            Ok(())
        }
    }

    struct FailingRecommender;

    #[async_trait]
    impl RecommendationGenerator for FailingRecommender {
        async fn generate(
            &self,
            _package_dir: &Path,
            _interview: Option<&Path>,
            _skip_extraction: bool,
        ) -> Result<(), DelegateError> {
            Err(DelegateError::Failed("scoring failed".to_string()))
        }
    }

    /// Counts fetches; URLs containing "fail" return an HTTP error.
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileFetcher for CountingFetcher {
        async fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("fail") {
                return Err(FetchError::Http("connection refused".to_string()));
            }
            fs::write(destination, b"bytes")?;
            Ok(())
        }
    }

    struct CapturingTelemetry {
        events: Mutex<Vec<CompletionEvent>>,
    }

    impl CapturingTelemetry {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl TelemetrySink for CapturingTelemetry {
        fn record(&self, event: &CompletionEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn test_config(root: &Path, toolset: &str, fail_one_fetch: bool) -> CompletionConfig {
        let url = |i: usize| {
            if fail_one_fetch && i == 1 {
                "http://fail.example/file".to_string()
            } else {
                format!("http://ok.example/file-{}", i)
            }
        };
        let deliverables = (0..3)
            .map(|i| Deliverable {
                name: format!("deliverable-{}", i),
                url: url(i),
                filename: format!("file-{}.bin", i),
                replicate_to_shared: i > 0,
            })
            .collect();
        CompletionConfig::default()
            .with_output_root(root.join("out"))
            .with_shared_dir(root.join("shared"))
            .with_toolset_version(ToolVersion::parse(toolset))
            .with_deliverables(deliverables)
    }

    fn pipeline(
        config: CompletionConfig,
        fetcher: Arc<CountingFetcher>,
        telemetry: Arc<CapturingTelemetry>,
    ) -> CompletionPipeline {
        CompletionPipeline::new(
            config,
            Arc::new(OkExporter),
            Arc::new(OkRecommender {
                calls: AtomicUsize::new(0),
            }),
            fetcher,
        )
        .with_telemetry(telemetry)
    }

    #[tokio::test]
    async fn scenario_a_matching_versions_full_run() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), true, 9);
        let config = test_config(tmp.path(), "1.2.0.0", false);
        let fetcher = Arc::new(CountingFetcher::new());
        let telemetry = Arc::new(CapturingTelemetry::new());
        let p = pipeline(config.clone(), Arc::clone(&fetcher), Arc::clone(&telemetry));

        let report = p.run(CompletionRequest::new(pkg)).await.unwrap();

        assert!(report.reports_generated);
        assert!(!report.is_degraded());
        assert!(report.advisories.is_empty());
        // Raw artifacts were pruned after export.
        let (inspection, _) = inspector::inspect(&report.output_dir, &config).unwrap();
        assert_eq!(inspection.data_artifacts.len(), 0);
        assert!(!inspection.is_fully_processed);
        // Shared dir got the report and the two templates.
        assert!(config.shared_dir.join("Report.html").is_file());
        assert!(config.shared_dir.join("file-1.bin").is_file());
        assert!(!config.shared_dir.join("file-0.bin").exists());

        let events = telemetry.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].success);
        assert_eq!(events[0].assessment_id.as_deref(), Some("a-1"));
    }

    #[tokio::test]
    async fn scenario_b_version_skew_is_advisory_only() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), true, 9);
        let config = test_config(tmp.path(), "1.3.0.0", false);
        let fetcher = Arc::new(CountingFetcher::new());
        let telemetry = Arc::new(CapturingTelemetry::new());
        let p = pipeline(config, fetcher, telemetry);

        let report = p.run(CompletionRequest::new(pkg)).await.unwrap();

        let mismatches: Vec<_> = report
            .advisories
            .iter()
            .filter(|a| matches!(a, Advisory::VersionMismatch { .. }))
            .collect();
        assert_eq!(mismatches.len(), 1);
        let text = mismatches[0].to_string();
        assert!(text.contains("1.2.0.0"));
        assert!(text.contains("1.3.0.0"));
        assert!(report.reports_generated);
    }

    #[tokio::test]
    async fn scenario_c_missing_manifest_fails_before_any_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), false, 9);
        let config = test_config(tmp.path(), "1.2.0.0", false);
        let fetcher = Arc::new(CountingFetcher::new());
        let telemetry = Arc::new(CapturingTelemetry::new());
        let p = pipeline(config, Arc::clone(&fetcher), Arc::clone(&telemetry));

        let err = p.run(CompletionRequest::new(pkg)).await.unwrap_err();

        assert!(matches!(err, CompletionError::ManifestInvalid(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        let events = telemetry.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].success);
        assert!(events[0].error.is_some());
    }

    #[tokio::test]
    async fn scenario_d_one_failed_fetch_degrades_but_completes() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), true, 9);
        let config = test_config(tmp.path(), "1.2.0.0", true);
        let fetcher = Arc::new(CountingFetcher::new());
        let telemetry = Arc::new(CapturingTelemetry::new());
        let p = pipeline(config, Arc::clone(&fetcher), telemetry);

        let report = p.run(CompletionRequest::new(pkg)).await.unwrap();

        assert!(report.is_degraded());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert!(report.output_dir.join("file-0.bin").is_file());
        assert!(!report.output_dir.join("file-1.bin").exists());
        assert!(report.output_dir.join("file-2.bin").is_file());
    }

    #[tokio::test]
    async fn second_run_of_same_extraction_skips_report_generation() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), true, 9);
        let config = test_config(tmp.path(), "1.2.0.0", false);
        let fetcher = Arc::new(CountingFetcher::new());
        let telemetry = Arc::new(CapturingTelemetry::new());
        let p = pipeline(config, fetcher, telemetry);

        let first = p.run(CompletionRequest::new(pkg.clone())).await.unwrap();
        assert!(first.reports_generated);

        // Re-staging resets the extraction, so reports regenerate; the gate's
        // skip path is observable only without re-extraction (covered in
        // gates tests). Here we assert the whole run stays idempotent.
        let second = p.run(CompletionRequest::new(pkg)).await.unwrap();
        assert!(second.reports_generated);
        assert_eq!(first.output_dir, second.output_dir);
    }

    #[tokio::test]
    async fn requested_recommendations_run_and_failures_are_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), true, 9);
        let config = test_config(tmp.path(), "1.2.0.0", false);

        let recommender = Arc::new(OkRecommender {
            calls: AtomicUsize::new(0),
        });
        let p = CompletionPipeline::new(
            config.clone(),
            Arc::new(OkExporter),
            Arc::clone(&recommender) as Arc<dyn RecommendationGenerator>,
            Arc::new(CountingFetcher::new()),
        );
        let mut request = CompletionRequest::new(pkg.clone());
        request.include_recommendations = true;
        let report = p.run(request).await.unwrap();
        assert!(report.recommendations_generated);
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 1);
        assert!(report.output_dir.join("Recommendations.json").is_file());

        let failing = CompletionPipeline::new(
            config,
            Arc::new(OkExporter),
            Arc::new(FailingRecommender),
            Arc::new(CountingFetcher::new()),
        );
        let mut request = CompletionRequest::new(pkg);
        request.include_recommendations = true;
        let err = failing.run(request).await.unwrap_err();
        assert!(matches!(err, CompletionError::Recommendations(_)));
    }

    #[tokio::test]
    async fn skip_shared_dir_leaves_it_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let pkg = write_package(tmp.path(), true, 9);
        let config = test_config(tmp.path(), "1.2.0.0", false);
        let shared = config.shared_dir.clone();
        let p = pipeline(
            config,
            Arc::new(CountingFetcher::new()),
            Arc::new(CapturingTelemetry::new()),
        );

        let mut request = CompletionRequest::new(pkg);
        request.stage_to_shared_dir = false;
        p.run(request).await.unwrap();
        assert!(!shared.exists());
    }
}
