use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The pod version being published. Immutable once the workflow is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodVersion {
    pub name: String,
    pub version: String,
    /// Canonical URL of the pod, used as the pull-request body.
    pub url: String,
    /// Raw podspec content written into the specs repository.
    pub specification: String,
}

impl PodVersion {
    /// Path of the podspec inside the specs repository.
    pub fn destination_path(&self) -> String {
        format!("{}/{}/{}.podspec", self.name, self.version, self.name)
    }

    /// Commit message and pull-request title.
    pub fn add_message(&self) -> String {
        format!("[Add] {} {}", self.name, self.version)
    }

    pub fn branch_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// One audit-log entry. Append-only, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
