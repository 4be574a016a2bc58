pub mod file;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::workflow::{LogEntry, SubmissionWorkflow};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable storage for submission workflows and their audit logs.
///
/// `save` is a compare-and-set: it fails with `AppError::Conflict` when the
/// persisted revision no longer matches the one the caller loaded, so a lost
/// race between two writers surfaces instead of silently double-publishing.
/// On success the workflow's revision is bumped in place.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Persist a brand-new workflow, failing with `AppError::Duplicate` if
    /// any workflow already exists for the same pod name/version. The
    /// existence check and the write are atomic, so two concurrent
    /// submissions of the same pod cannot both create a workflow.
    async fn create(&self, workflow: &mut SubmissionWorkflow) -> Result<()>;

    async fn save(&self, workflow: &mut SubmissionWorkflow) -> Result<()>;

    async fn load(&self, id: Uuid) -> Result<Option<SubmissionWorkflow>>;

    /// Workflow for a specific pod name/version, if one was ever submitted.
    async fn find_by_pod(&self, name: &str, version: &str)
        -> Result<Option<SubmissionWorkflow>>;

    /// Workflow whose pull request carries the given number.
    async fn find_by_pull_request(&self, number: u64) -> Result<Option<SubmissionWorkflow>>;

    /// All workflows that have not reached the terminal state.
    async fn list_incomplete(&self) -> Result<Vec<SubmissionWorkflow>>;

    /// Append one audit-log entry. Independent of `save` so that a step's
    /// pre-call entry survives even when the step itself fails.
    async fn append_log(&self, id: Uuid, entry: LogEntry) -> Result<()>;

    /// Ordered audit log for display.
    async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>>;
}
