pub mod github;

use async_trait::async_trait;

use crate::error::Result;

/// Remote specs-repository operations the submission workflow depends on.
///
/// Each call either returns the identifier the workflow persists or fails
/// with a transport/remote error the workflow does not interpret further.
#[async_trait]
pub trait RemoteRepo: Send + Sync {
    /// Latest commit SHA of the base branch.
    async fn fetch_latest_commit_sha(&self) -> Result<String>;

    /// Tree SHA of the given commit.
    async fn fetch_tree_sha(&self, commit_sha: &str) -> Result<String>;

    /// Create a tree on top of `base_tree_sha` containing `content` at `path`.
    async fn create_tree(&self, base_tree_sha: &str, path: &str, content: &str) -> Result<String>;

    /// Create a commit for `tree_sha` with a single parent.
    async fn create_commit(&self, tree_sha: &str, parent_sha: &str, message: &str)
        -> Result<String>;

    /// Create a branch pointing at `commit_sha`, returning its full ref.
    async fn create_branch(&self, name: &str, commit_sha: &str) -> Result<String>;

    /// Open a pull request from `branch_ref` against the base branch.
    async fn create_pull_request(&self, title: &str, body: &str, branch_ref: &str) -> Result<u64>;
}
