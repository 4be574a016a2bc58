use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::store::WorkflowStore;
use crate::workflow::{LogEntry, SubmissionWorkflow};

/// File-backed store: one JSON document per workflow plus a JSONL audit log.
///
/// Documents are written to a temp file and renamed into place so a crash
/// mid-write never leaves a truncated workflow on disk. `write_lock` is
/// held across the read-check-write of `create` and `save`, making both
/// atomic with respect to each other; without it two savers that loaded
/// the same revision could both pass the check and both write.
pub struct FileStore {
    data_dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn workflow_path(&self, id: Uuid) -> PathBuf {
        self.data_dir.join(format!("{id}.json"))
    }

    fn log_path(&self, id: Uuid) -> PathBuf {
        self.data_dir.join(format!("{id}.log.jsonl"))
    }

    async fn read_workflow(&self, path: &Path) -> Result<SubmissionWorkflow> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_workflow(&self, workflow: &SubmissionWorkflow) -> Result<()> {
        let path = self.workflow_path(workflow.id);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(workflow)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for FileStore {
    async fn create(&self, workflow: &mut SubmissionWorkflow) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self
            .scan()
            .await?
            .iter()
            .any(|w| w.pod.name == workflow.pod.name && w.pod.version == workflow.pod.version)
        {
            return Err(AppError::Duplicate(
                workflow.pod.name.clone(),
                workflow.pod.version.clone(),
            ));
        }

        if workflow.revision != 0 {
            return Err(AppError::Conflict(workflow.id));
        }

        workflow.revision = 1;
        self.write_workflow(workflow).await
    }

    async fn save(&self, workflow: &mut SubmissionWorkflow) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.workflow_path(workflow.id);

        match self.read_workflow(&path).await {
            Ok(existing) => {
                if existing.revision != workflow.revision {
                    return Err(AppError::Conflict(workflow.id));
                }
            }
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                if workflow.revision != 0 {
                    return Err(AppError::Conflict(workflow.id));
                }
            }
            Err(e) => return Err(e),
        }

        workflow.revision += 1;
        self.write_workflow(workflow).await
    }

    async fn load(&self, id: Uuid) -> Result<Option<SubmissionWorkflow>> {
        match self.read_workflow(&self.workflow_path(id)).await {
            Ok(workflow) => Ok(Some(workflow)),
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_by_pod(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<SubmissionWorkflow>> {
        for workflow in self.scan().await? {
            if workflow.pod.name == name && workflow.pod.version == version {
                return Ok(Some(workflow));
            }
        }
        Ok(None)
    }

    async fn find_by_pull_request(&self, number: u64) -> Result<Option<SubmissionWorkflow>> {
        for workflow in self.scan().await? {
            if workflow.pull_request_number == Some(number) {
                return Ok(Some(workflow));
            }
        }
        Ok(None)
    }

    async fn list_incomplete(&self) -> Result<Vec<SubmissionWorkflow>> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter(|w| !w.is_complete())
            .collect())
    }

    async fn append_log(&self, id: Uuid, entry: LogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(id))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        let content = match tokio::fs::read_to_string(self.log_path(id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).map_err(Into::into))
            .collect()
    }
}

impl FileStore {
    async fn scan(&self) -> Result<Vec<SubmissionWorkflow>> {
        let mut workflows = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().map_or(false, |e| e == "json") {
                continue;
            }

            match self.read_workflow(&path).await {
                Ok(workflow) => workflows.push(workflow),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable workflow file");
                }
            }
        }

        Ok(workflows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::PodVersion;

    fn pod() -> PodVersion {
        PodVersion {
            name: "AFNetworking".to_string(),
            version: "1.0.0".to_string(),
            url: "http://example.com/AFNetworking".to_string(),
            specification: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let mut workflow = SubmissionWorkflow::new(pod());
        store.save(&mut workflow).await.unwrap();
        assert_eq!(workflow.revision, 1);

        let loaded = store.load(workflow.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, workflow.id);
        assert_eq!(loaded.pod.name, "AFNetworking");
        assert_eq!(loaded.revision, 1);
    }

    #[tokio::test]
    async fn concurrent_saves_from_same_revision_conflict() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());

        // Two writers load the same revision and race; exactly one save
        // must land and the other must observe the conflict.
        for round in 0..50 {
            let mut workflow = SubmissionWorkflow::new(PodVersion {
                name: format!("Pod{round}"),
                version: "1.0.0".to_string(),
                url: "http://example.com".to_string(),
                specification: "{}".to_string(),
            });
            store.save(&mut workflow).await.unwrap();

            let mut first = store.load(workflow.id).await.unwrap().unwrap();
            let mut second = store.load(workflow.id).await.unwrap().unwrap();
            first.base_commit_sha = Some("abc123".to_string());
            second.base_commit_sha = Some("def456".to_string());

            let store_a = Arc::clone(&store);
            let store_b = Arc::clone(&store);
            let a = tokio::spawn(async move { store_a.save(&mut first).await });
            let b = tokio::spawn(async move { store_b.save(&mut second).await });
            let results = [a.await.unwrap(), b.await.unwrap()];

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert_eq!(
                results
                    .iter()
                    .filter(|r| matches!(r, Err(AppError::Conflict(_))))
                    .count(),
                1
            );

            let persisted = store.load(workflow.id).await.unwrap().unwrap();
            assert_eq!(persisted.revision, 2);
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_pod_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let mut first = SubmissionWorkflow::new(pod());
        store.create(&mut first).await.unwrap();

        let mut second = SubmissionWorkflow::new(pod());
        let err = store.create(&mut second).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_, _)));

        // A different version of the same pod is fine.
        let mut other = SubmissionWorkflow::new(PodVersion {
            version: "2.0.0".to_string(),
            ..pod()
        });
        store.create(&mut other).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_creates_admit_exactly_one() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());

        let store_a = Arc::clone(&store);
        let store_b = Arc::clone(&store);
        let a = tokio::spawn(async move {
            store_a.create(&mut SubmissionWorkflow::new(pod())).await
        });
        let b = tokio::spawn(async move {
            store_b.create(&mut SubmissionWorkflow::new(pod())).await
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(AppError::Duplicate(_, _))))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn save_rejects_stale_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let mut workflow = SubmissionWorkflow::new(pod());
        store.save(&mut workflow).await.unwrap();

        // A second writer loaded the same revision and saved first.
        let mut racer = store.load(workflow.id).await.unwrap().unwrap();
        store.save(&mut racer).await.unwrap();

        workflow.base_commit_sha = Some("abc123".to_string());
        let err = store.save(&mut workflow).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_incomplete_skips_finished_workflows() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let mut pending = SubmissionWorkflow::new(pod());
        store.save(&mut pending).await.unwrap();

        let mut done = SubmissionWorkflow::new(PodVersion {
            name: "Other".to_string(),
            version: "2.0.0".to_string(),
            url: "http://example.com/Other".to_string(),
            specification: "{}".to_string(),
        });
        done.base_commit_sha = Some("a".to_string());
        done.base_tree_sha = Some("b".to_string());
        done.new_tree_sha = Some("c".to_string());
        done.new_commit_sha = Some("d".to_string());
        done.new_branch_ref = Some("refs/heads/Other-2.0.0".to_string());
        done.pull_request_number = Some(7);
        store.save(&mut done).await.unwrap();

        let incomplete = store.list_incomplete().await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].id, pending.id);
    }

    #[tokio::test]
    async fn logs_are_ordered_and_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let id = Uuid::new_v4();

        store.append_log(id, LogEntry::new("Submitted")).await.unwrap();
        store
            .append_log(id, LogEntry::new("Fetching latest commit SHA."))
            .await
            .unwrap();

        let logs = store.logs(id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "Submitted");
        assert_eq!(logs[1].message, "Fetching latest commit SHA.");
    }

    #[tokio::test]
    async fn logs_for_unknown_workflow_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert!(store.logs(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
