//! Pipeline configuration.
//!
//! Every stage is a function of its inputs plus this context struct; nothing
//! reads ambient process-wide state. Defaults mirror the collector's layout
//! conventions and can be overridden per run.

use std::path::PathBuf;

use crate::model::ToolVersion;

/// Version of this toolset, from Cargo.toml.
pub const TOOLSET_VERSION: &str = env!("CARGO_PKG_VERSION");

const DELIVERABLE_BASE_URL: &str =
    "https://raw.githubusercontent.com/azsvc/assessment-toolkit/main/assets";

/// An auxiliary file staged alongside the package output.
#[derive(Debug, Clone)]
pub struct Deliverable {
    /// Operator-facing name used in logs and advisories.
    pub name: String,

    /// Remote source, fetched with a plain GET.
    pub url: String,

    /// Destination filename inside the output directory.
    pub filename: String,

    /// Whether this file is also copied into the shared working directory.
    pub replicate_to_shared: bool,
}

/// Context for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Root under which per-package output directories are created.
    pub output_root: PathBuf,

    /// Shared working directory for replicated artifacts.
    pub shared_dir: PathBuf,

    /// Manifest filename at the root of every extracted package.
    pub manifest_filename: String,

    /// Prefix of the single tenant data subdirectory (e.g. `AAD-`).
    pub tenant_dir_prefix: String,

    /// Filename suffix identifying raw data artifacts (e.g. `Data.xml`).
    pub data_artifact_suffix: String,

    /// Number of raw artifacts a fully collected package carries. Tracks the
    /// collector's category count, so it is configuration rather than a
    /// constant.
    pub expected_artifact_count: usize,

    /// Auxiliary files fetched into every output directory.
    pub deliverables: Vec<Deliverable>,

    /// Version of the running toolset, compared against the producer's.
    pub toolset_version: ToolVersion,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let output_root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("AzureADAssessment");
        let shared_dir = output_root.join("shared");
        Self {
            output_root,
            shared_dir,
            manifest_filename: "AzureADAssessment.json".to_string(),
            tenant_dir_prefix: "AAD-".to_string(),
            data_artifact_suffix: "Data.xml".to_string(),
            expected_artifact_count: 9,
            deliverables: default_deliverables(),
            toolset_version: ToolVersion::parse(TOOLSET_VERSION),
        }
    }
}

impl CompletionConfig {
    pub fn with_output_root(mut self, root: PathBuf) -> Self {
        self.output_root = root;
        self
    }

    pub fn with_shared_dir(mut self, dir: PathBuf) -> Self {
        self.shared_dir = dir;
        self
    }

    pub fn with_toolset_version(mut self, version: ToolVersion) -> Self {
        self.toolset_version = version;
        self
    }

    pub fn with_expected_artifact_count(mut self, count: usize) -> Self {
        self.expected_artifact_count = count;
        self
    }

    pub fn with_deliverables(mut self, deliverables: Vec<Deliverable>) -> Self {
        self.deliverables = deliverables;
        self
    }
}

fn default_deliverables() -> Vec<Deliverable> {
    vec![
        Deliverable {
            name: "migration utility".to_string(),
            url: format!("{DELIVERABLE_BASE_URL}/MigrateAssessment.ps1"),
            filename: "MigrateAssessment.ps1".to_string(),
            replicate_to_shared: false,
        },
        Deliverable {
            name: "dashboard template".to_string(),
            url: format!("{DELIVERABLE_BASE_URL}/AssessmentDashboard.pbit"),
            filename: "AssessmentDashboard.pbit".to_string(),
            replicate_to_shared: true,
        },
        Deliverable {
            name: "dashboard details template".to_string(),
            url: format!("{DELIVERABLE_BASE_URL}/AssessmentDetails.pbit"),
            filename: "AssessmentDetails.pbit".to_string(),
            replicate_to_shared: true,
        },
    ]
}
