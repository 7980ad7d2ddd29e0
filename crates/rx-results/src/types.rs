//! Result data types.

use rx_project::SubsystemKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Summary written next to the streams of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub case_name: String,
    /// Local time the run directory was created (RFC 3339).
    pub timestamp: String,
    pub input_sha256: String,
    pub solve: Vec<SubsystemKind>,
    pub solver: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_final_s: Option<f64>,
    #[serde(default)]
    pub samples: usize,
    /// Data files of the run, in the order they were opened.
    #[serde(default)]
    pub streams: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
