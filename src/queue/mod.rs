pub mod startup;
pub mod task;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::server::AppState;
use crate::store::WorkflowStore;

use task::Task;

/// FIFO queue of advancement tasks, drained by a single processor.
///
/// One pending task per workflow id: enqueueing an id that is already
/// queued is a no-op. Together with the single consumer this gives the
/// single-writer discipline workflow advancement requires.
pub struct TaskQueue {
    pending: VecDeque<Task>,
    queued: HashSet<Uuid>,
    /// Notification channel for the processor.
    notify: Option<tokio::sync::mpsc::UnboundedSender<()>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            queued: HashSet::new(),
            notify: None,
        }
    }

    pub fn set_notifier(&mut self, tx: tokio::sync::mpsc::UnboundedSender<()>) {
        self.notify = Some(tx);
    }

    pub fn enqueue(&mut self, task: Task) {
        if !self.queued.insert(task.workflow_id) {
            tracing::debug!(task = %task.description(), "Task already queued, skipping");
            return;
        }

        tracing::info!(task = %task.description(), "Enqueuing task");
        self.pending.push_back(task);

        if let Some(ref tx) = self.notify {
            let _ = tx.send(());
        }
    }

    pub fn take_next(&mut self) -> Option<Task> {
        let task = self.pending.pop_front()?;
        self.queued.remove(&task.workflow_id);
        Some(task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the background queue processor.
pub async fn run_queue_processor(state: Arc<AppState>) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();

    {
        let mut queue = state.task_queue.write().await;
        queue.set_notifier(tx.clone());
    }

    // Prime the channel so tasks enqueued before the notifier was installed
    // (startup scan) are drained immediately.
    let _ = tx.send(());

    tracing::info!("Queue processor started");

    loop {
        // Wait for notification
        let _ = rx.recv().await;

        // Process all available tasks
        loop {
            let task = {
                let mut queue = state.task_queue.write().await;
                queue.take_next()
            };

            let task = match task {
                Some(t) => t,
                None => break,
            };

            tracing::info!(task = %task.description(), "Processing task");
            process_task(&state, task).await;
        }
    }
}

/// Advance one workflow step by step until it completes or a step fails.
/// A failed step is retried by re-enqueueing the task after a delay; the
/// workflow's own state guarantees the retry redoes the failing step.
async fn process_task(state: &Arc<AppState>, task: Task) {
    let mut workflow = match state.store.load(task.workflow_id).await {
        Ok(Some(workflow)) => workflow,
        Ok(None) => {
            tracing::warn!(task = %task.description(), "Workflow not found, dropping task");
            return;
        }
        Err(e) => {
            tracing::error!(task = %task.description(), error = %e, "Failed to load workflow");
            schedule_retry(state, task);
            return;
        }
    };

    while !workflow.is_complete() {
        match workflow
            .advance_one_step(&state.remote, &state.store)
            .await
        {
            Ok(step) => {
                tracing::info!(
                    workflow = %workflow.id,
                    step = ?step,
                    "Workflow advanced"
                );
            }
            Err(e) => {
                tracing::error!(
                    workflow = %workflow.id,
                    step = ?workflow.next_step(),
                    error = %e,
                    "Workflow step failed, scheduling retry"
                );
                schedule_retry(state, task);
                return;
            }
        }
    }

    tracing::info!(
        workflow = %workflow.id,
        pull_request = ?workflow.pull_request_number,
        "Submission complete"
    );
}

fn schedule_retry(state: &Arc<AppState>, task: Task) {
    let delay = Duration::from_secs(state.config.queue.retry_delay_secs);
    let state = Arc::clone(state);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut queue = state.task_queue.write().await;
        queue.enqueue(task);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: Uuid) -> Task {
        Task {
            workflow_id: id,
            pod: "AFNetworking 1.0.0".to_string(),
        }
    }

    #[test]
    fn enqueue_dedupes_by_workflow_id() {
        let mut queue = TaskQueue::new();
        let id = Uuid::new_v4();

        queue.enqueue(task(id));
        queue.enqueue(task(id));
        assert_eq!(queue.len(), 1);

        // Once taken, the id may be enqueued again.
        queue.take_next().unwrap();
        queue.enqueue(task(id));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn take_next_is_fifo() {
        let mut queue = TaskQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        queue.enqueue(task(first));
        queue.enqueue(task(second));

        assert_eq!(queue.take_next().unwrap().workflow_id, first);
        assert_eq!(queue.take_next().unwrap().workflow_id, second);
        assert!(queue.take_next().is_none());
    }
}
