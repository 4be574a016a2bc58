use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::store::WorkflowStore;
use crate::workflow::{LogEntry, SubmissionWorkflow};

/// In-memory store. Used by tests and ephemeral single-process runs;
/// state does not survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    workflows: RwLock<HashMap<Uuid, SubmissionWorkflow>>,
    logs: RwLock<HashMap<Uuid, Vec<LogEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn create(&self, workflow: &mut SubmissionWorkflow) -> Result<()> {
        let mut workflows = self.workflows.write().await;

        if workflows
            .values()
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
        workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn save(&self, workflow: &mut SubmissionWorkflow) -> Result<()> {
        let mut workflows = self.workflows.write().await;

        if let Some(existing) = workflows.get(&workflow.id) {
            if existing.revision != workflow.revision {
                return Err(AppError::Conflict(workflow.id));
            }
        } else if workflow.revision != 0 {
            return Err(AppError::Conflict(workflow.id));
        }

        workflow.revision += 1;
        workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<SubmissionWorkflow>> {
        Ok(self.workflows.read().await.get(&id).cloned())
    }

    async fn find_by_pod(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<SubmissionWorkflow>> {
        Ok(self
            .workflows
            .read()
            .await
            .values()
            .find(|w| w.pod.name == name && w.pod.version == version)
            .cloned())
    }

    async fn find_by_pull_request(&self, number: u64) -> Result<Option<SubmissionWorkflow>> {
        Ok(self
            .workflows
            .read()
            .await
            .values()
            .find(|w| w.pull_request_number == Some(number))
            .cloned())
    }

    async fn list_incomplete(&self) -> Result<Vec<SubmissionWorkflow>> {
        Ok(self
            .workflows
            .read()
            .await
            .values()
            .filter(|w| !w.is_complete())
            .cloned()
            .collect())
    }

    async fn append_log(&self, id: Uuid, entry: LogEntry) -> Result<()> {
        self.logs.write().await.entry(id).or_default().push(entry);
        Ok(())
    }

    async fn logs(&self, id: Uuid) -> Result<Vec<LogEntry>> {
        Ok(self.logs.read().await.get(&id).cloned().unwrap_or_default())
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
    async fn create_rejects_duplicate_pod_version() {
        let store = MemoryStore::new();

        let mut first = SubmissionWorkflow::new(pod());
        store.create(&mut first).await.unwrap();
        assert_eq!(first.revision, 1);

        let mut second = SubmissionWorkflow::new(pod());
        let err = store.create(&mut second).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_, _)));
    }

    #[tokio::test]
    async fn concurrent_creates_admit_exactly_one() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());

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
}
