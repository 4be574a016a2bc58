use std::sync::Arc;

use crate::queue::task::Task;
use crate::server::AppState;
use crate::store::WorkflowStore;

/// Re-enqueue every incomplete workflow on startup.
///
/// This is what makes submissions resume after a restart: each workflow's
/// persisted fields already record which steps succeeded, so advancing it
/// picks up at the first unset field.
pub async fn scan_incomplete_workflows(state: &Arc<AppState>) {
    tracing::info!("Scanning for incomplete submission workflows...");

    let workflows = match state.store.list_incomplete().await {
        Ok(workflows) => workflows,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list incomplete workflows on startup");
            return;
        }
    };

    tracing::info!(count = workflows.len(), "Found incomplete workflows");

    for workflow in workflows {
        tracing::info!(
            workflow = %workflow.id,
            pod = %workflow.pod.name,
            version = %workflow.pod.version,
            next_step = ?workflow.next_step(),
            "Resuming submission workflow"
        );

        let task = Task {
            workflow_id: workflow.id,
            pod: format!("{} {}", workflow.pod.name, workflow.pod.version),
        };

        let mut queue = state.task_queue.write().await;
        queue.enqueue(task);
    }

    tracing::info!("Startup scan complete");
}
