use async_trait::async_trait;
use octocrab::Octocrab;
use serde_json::json;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::RemoteRepo;

/// GitHub implementation of [`RemoteRepo`] over the Git Data API.
pub struct GitHubRemote {
    owner: String,
    repo: String,
    base_branch: String,
    client: Octocrab,
}

impl GitHubRemote {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let (owner, repo) = Self::parse_repo(&config.repo)?;

        let client = Octocrab::builder()
            .personal_token(config.token.clone())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            base_branch: config.base_branch.clone(),
            client,
        })
    }

    fn parse_repo(repo_full_name: &str) -> Result<(&str, &str)> {
        let parts: Vec<&str> = repo_full_name.splitn(2, '/').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(format!(
                "Invalid repo name: {repo_full_name}"
            )));
        }
        Ok((parts[0], parts[1]))
    }

    fn sha_from(value: &serde_json::Value, context: &str) -> Result<String> {
        value["sha"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::RemoteCall(format!("No sha in {context} response")))
    }
}

#[async_trait]
impl RemoteRepo for GitHubRemote {
    async fn fetch_latest_commit_sha(&self) -> Result<String> {
        let url = format!(
            "/repos/{}/{}/commits/{}",
            self.owner, self.repo, self.base_branch
        );
        let commit: serde_json::Value = self
            .client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| AppError::RemoteCall(format!("Failed to fetch latest commit: {e}")))?;

        Self::sha_from(&commit, "commit")
    }

    async fn fetch_tree_sha(&self, commit_sha: &str) -> Result<String> {
        let url = format!("/repos/{}/{}/git/commits/{commit_sha}", self.owner, self.repo);
        let commit: serde_json::Value = self
            .client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| AppError::RemoteCall(format!("Failed to fetch commit {commit_sha}: {e}")))?;

        commit["tree"]["sha"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::RemoteCall("No tree sha in commit response".to_string()))
    }

    async fn create_tree(&self, base_tree_sha: &str, path: &str, content: &str) -> Result<String> {
        let url = format!("/repos/{}/{}/git/trees", self.owner, self.repo);
        let body = json!({
            "base_tree": base_tree_sha,
            "tree": [{
                "path": path,
                "mode": "100644",
                "type": "blob",
                "content": content,
            }],
        });

        let tree: serde_json::Value = self
            .client
            .post(&url, Some(&body))
            .await
            .map_err(|e| AppError::RemoteCall(format!("Failed to create tree: {e}")))?;

        Self::sha_from(&tree, "tree")
    }

    async fn create_commit(
        &self,
        tree_sha: &str,
        parent_sha: &str,
        message: &str,
    ) -> Result<String> {
        let url = format!("/repos/{}/{}/git/commits", self.owner, self.repo);
        let body = json!({
            "message": message,
            "tree": tree_sha,
            "parents": [parent_sha],
        });

        let commit: serde_json::Value = self
            .client
            .post(&url, Some(&body))
            .await
            .map_err(|e| AppError::RemoteCall(format!("Failed to create commit: {e}")))?;

        Self::sha_from(&commit, "commit")
    }

    async fn create_branch(&self, name: &str, commit_sha: &str) -> Result<String> {
        let url = format!("/repos/{}/{}/git/refs", self.owner, self.repo);
        let body = json!({
            "ref": format!("refs/heads/{name}"),
            "sha": commit_sha,
        });

        let created: serde_json::Value = self
            .client
            .post(&url, Some(&body))
            .await
            .map_err(|e| AppError::RemoteCall(format!("Failed to create branch {name}: {e}")))?;

        created["ref"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::RemoteCall("No ref in branch response".to_string()))
    }

    async fn create_pull_request(&self, title: &str, body: &str, branch_ref: &str) -> Result<u64> {
        // The pulls API wants the branch name, not the full ref.
        let head = branch_ref.strip_prefix("refs/heads/").unwrap_or(branch_ref);

        let created = self
            .client
            .pulls(&self.owner, &self.repo)
            .create(title, head, &self.base_branch)
            .body(body)
            .send()
            .await?;

        Ok(created.number)
    }
}
