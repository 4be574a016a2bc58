use std::sync::Arc;

use tokio::signal;

use crate::server::AppState;
use crate::store::WorkflowStore;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Log what remains in flight. Workflow state is already durable after
/// every successful step, so incomplete submissions resume on the next
/// startup scan.
pub async fn graceful_shutdown(state: &Arc<AppState>) {
    tracing::info!("Starting graceful shutdown...");

    match state.store.list_incomplete().await {
        Ok(incomplete) if incomplete.is_empty() => {
            tracing::info!("No incomplete submissions");
        }
        Ok(incomplete) => {
            for workflow in &incomplete {
                tracing::info!(
                    workflow = %workflow.id,
                    pod = %workflow.pod.name,
                    version = %workflow.pod.version,
                    next_step = ?workflow.next_step(),
                    "Submission will resume on next startup"
                );
            }
            tracing::info!(count = incomplete.len(), "Incomplete submissions recorded");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list incomplete workflows during shutdown");
        }
    }

    tracing::info!("Graceful shutdown complete");
}
