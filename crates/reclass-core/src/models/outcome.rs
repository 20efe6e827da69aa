use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to a job queued on the remote compute service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Task identifier assigned by the service
    pub id: String,

    /// Human readable task description
    pub description: String,

    /// When the task was submitted
    pub submitted_at: DateTime<Utc>,
}

/// Result of a reclassification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReclassOutcome {
    /// Local output written to disk
    Written {
        path: PathBuf,
        /// Legend sidecar, raster outputs only
        legend: Option<PathBuf>,
    },

    /// Remote export queued; completion is not tracked
    Submitted { asset_id: String, task: TaskHandle },
}

impl ReclassOutcome {
    /// Output artifact location (file path or asset id)
    pub fn location(&self) -> String {
        match self {
            ReclassOutcome::Written { path, .. } => path.display().to_string(),
            ReclassOutcome::Submitted { asset_id, .. } => asset_id.clone(),
        }
    }
}
