use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::platform::RemoteRepo;
use crate::store::WorkflowStore;
use crate::workflow::types::{LogEntry, PodVersion};

/// The step `advance_one_step` will perform next, named by the first unset
/// progress field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    NeedsBaseCommit,
    NeedsBaseTree,
    NeedsNewTree,
    NeedsNewCommit,
    NeedsNewBranch,
    NeedsPullRequest,
    Complete,
}

/// Persisted state of one pod-version publication attempt.
///
/// The five SHA/ref fields fill strictly left to right; once set a field is
/// never cleared or overwritten. Which step runs next is derived from these
/// fields alone, never from call history, which is what makes advancement
/// safe to retry after a crash or a failed remote call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionWorkflow {
    pub id: Uuid,
    pub pod: PodVersion,

    pub base_commit_sha: Option<String>,
    pub base_tree_sha: Option<String>,
    pub new_tree_sha: Option<String>,
    pub new_commit_sha: Option<String>,
    pub new_branch_ref: Option<String>,
    pub pull_request_number: Option<u64>,

    /// Optimistic-concurrency counter; bumped by the store on every save.
    pub revision: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionWorkflow {
    pub fn new(pod: PodVersion) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pod,
            base_commit_sha: None,
            base_tree_sha: None,
            new_tree_sha: None,
            new_commit_sha: None,
            new_branch_ref: None,
            pull_request_number: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create, persist, and record the initial "Submitted" audit entry.
    /// Fails with `AppError::Duplicate` if the pod version was already
    /// submitted.
    pub async fn create(pod: PodVersion, store: &dyn WorkflowStore) -> Result<Self> {
        let mut workflow = Self::new(pod);
        store.create(&mut workflow).await?;
        store
            .append_log(workflow.id, LogEntry::new("Submitted"))
            .await?;
        Ok(workflow)
    }

    pub fn is_complete(&self) -> bool {
        self.pull_request_number.is_some()
    }

    /// First unset field, scanned in fixed order.
    pub fn next_step(&self) -> Step {
        if self.base_commit_sha.is_none() {
            Step::NeedsBaseCommit
        } else if self.base_tree_sha.is_none() {
            Step::NeedsBaseTree
        } else if self.new_tree_sha.is_none() {
            Step::NeedsNewTree
        } else if self.new_commit_sha.is_none() {
            Step::NeedsNewCommit
        } else if self.new_branch_ref.is_none() {
            Step::NeedsNewBranch
        } else if self.pull_request_number.is_none() {
            Step::NeedsPullRequest
        } else {
            Step::Complete
        }
    }

    /// Perform exactly one remote call and persist its result.
    ///
    /// On a complete workflow this is a no-op: no remote call, no audit
    /// entry. The audit entry for an attempted step is written before the
    /// call, so a failed step leaves its entry behind; the progress field
    /// is only written on success, which keeps the step retryable.
    pub async fn advance_one_step(
        &mut self,
        remote: &dyn RemoteRepo,
        store: &dyn WorkflowStore,
    ) -> Result<Step> {
        let step = self.next_step();

        match step {
            Step::Complete => return Ok(Step::Complete),
            Step::NeedsBaseCommit => {
                self.log(store, "Fetching latest commit SHA.".to_string())
                    .await?;
                let sha = remote.fetch_latest_commit_sha().await?;
                self.base_commit_sha = Some(sha);
            }
            Step::NeedsBaseTree => {
                let commit = self.require(&self.base_commit_sha, "base_commit_sha")?;
                self.log(store, format!("Fetching tree SHA of commit {commit}."))
                    .await?;
                let sha = remote.fetch_tree_sha(&commit).await?;
                self.base_tree_sha = Some(sha);
            }
            Step::NeedsNewTree => {
                let base_tree = self.require(&self.base_tree_sha, "base_tree_sha")?;
                self.log(store, format!("Creating new tree based on tree {base_tree}."))
                    .await?;
                let sha = remote
                    .create_tree(
                        &base_tree,
                        &self.pod.destination_path(),
                        &self.pod.specification,
                    )
                    .await?;
                self.new_tree_sha = Some(sha);
            }
            Step::NeedsNewCommit => {
                let tree = self.require(&self.new_tree_sha, "new_tree_sha")?;
                let parent = self.require(&self.base_commit_sha, "base_commit_sha")?;
                self.log(store, format!("Creating new commit with tree {tree}."))
                    .await?;
                let sha = remote
                    .create_commit(&tree, &parent, &self.pod.add_message())
                    .await?;
                self.new_commit_sha = Some(sha);
            }
            Step::NeedsNewBranch => {
                let commit = self.require(&self.new_commit_sha, "new_commit_sha")?;
                let branch_name = self.pod.branch_name();
                self.log(
                    store,
                    format!("Creating new branch `{branch_name}' with commit {commit}."),
                )
                .await?;
                let branch_ref = remote.create_branch(&branch_name, &commit).await?;
                self.new_branch_ref = Some(branch_ref);
            }
            Step::NeedsPullRequest => {
                let branch_ref = self.require(&self.new_branch_ref, "new_branch_ref")?;
                self.log(
                    store,
                    format!("Creating new pull-request with branch {branch_ref}."),
                )
                .await?;
                let number = remote
                    .create_pull_request(&self.pod.add_message(), &self.pod.url, &branch_ref)
                    .await?;
                self.pull_request_number = Some(number);
            }
        }

        self.updated_at = Utc::now();
        store.save(self).await?;
        Ok(step)
    }

    async fn log(&self, store: &dyn WorkflowStore, message: String) -> Result<()> {
        store.append_log(self.id, LogEntry::new(message)).await
    }

    fn require(&self, field: &Option<String>, name: &str) -> Result<String> {
        field.clone().ok_or_else(|| {
            AppError::Internal(format!("workflow {} advanced with {name} unset", self.id))
        })
    }
}
