use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use assessment_completer::collaborators::{
    CommandExporter, CommandRecommender, EnvCredentialProvider, HttpFetcher, TracingTelemetry,
};
use assessment_completer::{CompletionConfig, CompletionPipeline, CompletionRequest};

#[derive(Parser, Debug)]
#[command(
    name = "assessment-completer",
    version,
    about = "Completes a collected tenant assessment package"
)]
struct Cli {
    /// Path to the assessment package archive
    package: PathBuf,

    /// Root directory for per-package output directories
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Do not replicate artifacts into the shared working directory
    #[arg(long, default_value_t = false)]
    skip_shared_dir: bool,

    /// Shared working directory for replicated artifacts
    #[arg(long)]
    shared_dir: Option<PathBuf>,

    /// Also generate a recommendations artifact
    #[arg(long, default_value_t = false)]
    recommendations: bool,

    /// Interview input forwarded to the recommendation generator
    #[arg(long)]
    interview: Option<PathBuf>,

    /// External command used to render report outputs
    #[arg(long, env = "ASSESSMENT_EXPORTER_CMD")]
    exporter_cmd: Option<String>,

    /// External command used to generate recommendations
    #[arg(long, env = "ASSESSMENT_RECOMMENDER_CMD")]
    recommender_cmd: Option<String>,

    /// Output machine-readable JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(serde::Serialize)]
struct JsonOut {
    ok: bool,
    degraded: bool,
    output_dir: PathBuf,
    assessment_id: String,
    tenant_domain: String,
    reports_generated: bool,
    recommendations_generated: bool,
    advisories: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = CompletionConfig::default();
    if let Some(root) = cli.output_root {
        config = config.with_output_root(root);
    }
    if let Some(shared) = cli.shared_dir {
        config = config.with_shared_dir(shared);
    }

    let pipeline = CompletionPipeline::new(
        config,
        Arc::new(CommandExporter::new(cli.exporter_cmd)),
        Arc::new(CommandRecommender::new(cli.recommender_cmd)),
        Arc::new(HttpFetcher::new()),
    )
    .with_telemetry(Arc::new(TracingTelemetry))
    .with_credentials(Arc::new(EnvCredentialProvider::default()));

    let request = CompletionRequest {
        package_path: cli.package,
        include_recommendations: cli.recommendations,
        interview_path: cli.interview,
        stage_to_shared_dir: !cli.skip_shared_dir,
    };

    let report = pipeline.run(request).await?;

    if cli.json {
        let out = JsonOut {
            ok: true,
            degraded: report.is_degraded(),
            output_dir: report.output_dir.clone(),
            assessment_id: report.manifest.assessment_id.clone(),
            tenant_domain: report.manifest.tenant_domain.clone(),
            reports_generated: report.reports_generated,
            recommendations_generated: report.recommendations_generated,
            advisories: report.advisories.iter().map(|a| a.to_string()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for advisory in &report.advisories {
            eprintln!("warning: {}", advisory);
        }
        if report.is_degraded() {
            eprintln!("completed with warnings (degraded)");
        }
        println!("output: {}", report.output_dir.display());
        println!(
            "tenant: {} ({})",
            report.manifest.tenant_domain, report.manifest.tenant_id
        );
        println!("reports generated: {}", report.reports_generated);
        if report.recommendations_generated {
            println!("recommendations generated: true");
        }
    }

    Ok(())
}
