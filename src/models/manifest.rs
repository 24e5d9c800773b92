//! Translation jobs and the manifests describing their progress.

use super::object::Urn;
use serde::{Deserialize, Serialize};

/// Output format requested for every translation: viewable in 2D and 3D.
pub const VIEWABLE_FORMAT: &str = "svf";
pub const VIEWABLE_VIEWS: [&str; 2] = ["2d", "3d"];

/// Body of the translation job request.
#[derive(Serialize, Debug, PartialEq)]
pub struct JobPayload {
    pub input: JobInput,
    pub output: JobOutput,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct JobInput {
    pub urn: String,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct JobOutput {
    pub formats: Vec<OutputFormat>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct OutputFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub views: Vec<String>,
}

impl JobPayload {
    pub fn viewable(urn: &Urn) -> Self {
        Self {
            input: JobInput {
                urn: urn.as_str().to_string(),
            },
            output: JobOutput {
                formats: vec![OutputFormat {
                    kind: VIEWABLE_FORMAT.into(),
                    views: VIEWABLE_VIEWS.iter().map(|v| v.to_string()).collect(),
                }],
            },
        }
    }
}

/// Acknowledgement of an accepted translation job.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub result: String,
    pub urn: String,
    #[serde(default)]
    pub accepted_jobs: Option<serde_json::Value>,
}

/// Status record of a translation job, keyed by URN.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub has_thumbnail: Option<String>,
    /// `pending`, `inprogress`, `success`, `failed` or `timeout`.
    pub status: String,
    /// `complete` once finished, otherwise e.g. `25% complete`.
    pub progress: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub urn: Option<String>,
    #[serde(default)]
    pub derivatives: Vec<serde_json::Value>,
}

impl Manifest {
    pub fn is_complete(&self) -> bool {
        self.progress.eq_ignore_ascii_case("complete")
    }

    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// Result of one manifest check.
#[derive(Debug)]
pub enum ManifestCheck {
    /// Still converting; nothing to hand back yet.
    Pending { status: String, progress: String },
    Complete(Manifest),
}

impl ManifestCheck {
    pub fn status(&self) -> &str {
        match self {
            ManifestCheck::Pending { status, .. } => status,
            ManifestCheck::Complete(manifest) => &manifest.status,
        }
    }

    /// The job ended without producing viewables: a finished manifest whose
    /// status is not `success`, or an unfinished one already `failed` or `timeout`.
    pub fn has_failed(&self) -> bool {
        match self {
            ManifestCheck::Complete(manifest) => !manifest.is_success(),
            ManifestCheck::Pending { status, .. } => matches!(
                status.to_ascii_lowercase().as_str(),
                "failed" | "timeout"
            ),
        }
    }
}
