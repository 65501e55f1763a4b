//! Core data types for the completion pipeline.
//!
//! These are the records that flow between stages: the assessment manifest
//! extracted from a package, the tagged toolset version, the non-fatal
//! advisories a run accumulates, and the final [`CompletionReport`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Metadata describing the assessment run that produced a package.
///
/// Stored as JSON at a fixed relative path inside every package. Field names
/// follow the wire format emitted by the collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentManifest {
    #[serde(rename = "AssessmentId")]
    pub assessment_id: String,

    /// Producer toolset version, dotted string (e.g. `"1.2.0.0"`).
    #[serde(rename = "AssessmentVersion")]
    pub assessment_version: String,

    #[serde(rename = "AssessmentTenantId")]
    pub tenant_id: String,

    #[serde(rename = "AssessmentTenantDomain")]
    pub tenant_domain: String,
}

/// A four-part dotted version (`major.minor.patch.build`).
///
/// Equality compares the numeric parts; the raw string the value was parsed
/// from is retained so advisories can quote it verbatim.
#[derive(Debug, Clone)]
pub struct VersionQuad {
    pub parts: [u32; 4],
    raw: String,
}

impl VersionQuad {
    pub fn new(parts: [u32; 4]) -> Self {
        let raw = format!("{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[3]);
        Self { parts, raw }
    }
}

impl PartialEq for VersionQuad {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for VersionQuad {}

impl fmt::Display for VersionQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A toolset version with its distribution channel made explicit.
///
/// The collector marks builds that were not installed from the official
/// release channel with a `-1` build component; that sentinel never leaves
/// the parser — it becomes [`ToolVersion::NonCanonical`] here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolVersion {
    /// Installed from the official release channel.
    Canonical(VersionQuad),
    /// Local or development build; version comparison is meaningless.
    NonCanonical,
}

impl ToolVersion {
    /// Parses a dotted version string with 2–4 components.
    ///
    /// Missing trailing components default to zero. A `-1` component (the
    /// collector's "not canonically installed" marker) or any unparseable
    /// component yields [`ToolVersion::NonCanonical`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let components: Vec<&str> = raw.split('.').collect();
        if components.len() < 2 || components.len() > 4 {
            return ToolVersion::NonCanonical;
        }
        let mut parts = [0u32; 4];
        for (i, c) in components.iter().enumerate() {
            match c.trim().parse::<i64>() {
                Ok(n) if (0..=i64::from(u32::MAX)).contains(&n) => parts[i] = n as u32,
                _ => return ToolVersion::NonCanonical,
            }
        }
        ToolVersion::Canonical(VersionQuad {
            parts,
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolVersion::Canonical(v) => write!(f, "{}", v),
            ToolVersion::NonCanonical => f.write_str("non-canonical"),
        }
    }
}

/// Non-fatal conditions surfaced to the operator.
///
/// Advisories never alter control flow; they are collected on the
/// [`CompletionReport`] and rendered as warnings.
#[derive(Debug, Clone)]
pub enum Advisory {
    /// Raw artifact count is neither zero nor the expected count.
    IncompleteCollection { found: usize, expected: usize },

    /// The package was produced by a non-canonical toolset build.
    ProducerNotCanonical,

    /// The running toolset is a non-canonical build.
    ToolsetNotCanonical,

    /// Producer and consumer versions differ.
    VersionMismatch { package: String, toolset: String },

    /// A remote deliverable could not be fetched.
    DeliverableFetchFailed { name: String, reason: String },

    /// The report exporter reported failure; raw artifacts were kept.
    ReportExportFailed { reason: String },

    /// A raw artifact could not be deleted after report export.
    ArtifactPruneFailed { path: PathBuf, reason: String },
}

impl Advisory {
    /// Whether this advisory marks the run as degraded rather than clean.
    pub fn is_degrading(&self) -> bool {
        matches!(
            self,
            Advisory::DeliverableFetchFailed { .. } | Advisory::ReportExportFailed { .. }
        )
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::IncompleteCollection { found, expected } => write!(
                f,
                "package contains {} raw data artifacts where {} were expected; \
                 the collection may be partial and generated reports may be incomplete",
                found, expected
            ),
            Advisory::ProducerNotCanonical => write!(
                f,
                "this package was produced by a toolset that was not installed from \
                 the official release channel; install the released toolset before \
                 collecting packages"
            ),
            Advisory::ToolsetNotCanonical => write!(
                f,
                "the running toolset was not installed from the official release \
                 channel; install the released toolset before completing assessments"
            ),
            Advisory::VersionMismatch { package, toolset } => write!(
                f,
                "package was produced with toolset version {package} but this toolset \
                 is version {toolset}; matching versions should be used. Remediation: \
                 `assessment-toolkit uninstall` then \
                 `assessment-toolkit install --version {package}`"
            ),
            Advisory::DeliverableFetchFailed { name, reason } => {
                write!(f, "failed to fetch deliverable '{}': {}", name, reason)
            }
            Advisory::ReportExportFailed { reason } => write!(
                f,
                "report export failed, raw data artifacts were kept for a retry: {}",
                reason
            ),
            Advisory::ArtifactPruneFailed { path, reason } => write!(
                f,
                "could not remove raw artifact '{}' after export: {}",
                path.display(),
                reason
            ),
        }
    }
}

/// Result of inspecting an extracted package.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub manifest: AssessmentManifest,

    /// The single tenant-prefixed subdirectory holding raw data exports.
    pub tenant_data_dir: PathBuf,

    /// Raw data artifacts found under the tenant data directory, sorted.
    pub data_artifacts: Vec<PathBuf>,

    /// True when exactly the expected artifact count is present, meaning
    /// reports have not yet been generated from this extraction.
    pub is_fully_processed: bool,
}

/// Outcome of a successful pipeline run.
#[derive(Debug)]
pub struct CompletionReport {
    pub output_dir: PathBuf,
    pub manifest: AssessmentManifest,
    pub advisories: Vec<Advisory>,
    pub reports_generated: bool,
    pub recommendations_generated: bool,
}

impl CompletionReport {
    /// True when every stage ran but some deliverable or export degraded.
    pub fn is_degraded(&self) -> bool {
        self.advisories.iter().any(Advisory::is_degrading)
    }
}

/// Telemetry payload recorded at the end of every run, success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvent {
    pub assessment_id: Option<String>,
    pub tenant_id: Option<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub credential_present: bool,
    pub error: Option<String>,
}
