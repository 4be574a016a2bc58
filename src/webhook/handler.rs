use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::server::AppState;
use crate::store::WorkflowStore;
use crate::webhook::events::BuildNotification;
use crate::webhook::token;
use crate::workflow::LogEntry;

/// `POST /travis-build-hook` — build notification from the CI service.
pub async fn handle_build_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let presented = match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(token) => token.trim(),
        None => {
            tracing::warn!("Missing Authorization header on build notification");
            return StatusCode::UNAUTHORIZED;
        }
    };

    if !token::authorized(
        &state.config.github.repo,
        state.config.travis_token(),
        presented,
    ) {
        tracing::warn!("Rejected build notification with invalid token");
        return StatusCode::UNAUTHORIZED;
    }

    let notification: BuildNotification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse build notification");
            return StatusCode::BAD_REQUEST;
        }
    };

    let payload = notification.payload;
    let pr_number = match payload.pull_request_number() {
        Some(number) => number,
        None => {
            tracing::debug!("Build notification is not for a pull request, ignoring");
            return StatusCode::OK;
        }
    };

    if !payload.build_success() {
        tracing::info!(pull_request = pr_number, "Pull-request build did not pass");
        return StatusCode::OK;
    }

    match state.store.find_by_pull_request(pr_number).await {
        Ok(Some(workflow)) => {
            tracing::info!(
                workflow = %workflow.id,
                pull_request = pr_number,
                "Pull-request build passed"
            );
            let entry = LogEntry::new(format!("Build passed for pull-request #{pr_number}."));
            if let Err(e) = state.store.append_log(workflow.id, entry).await {
                tracing::error!(workflow = %workflow.id, error = %e, "Failed to append build log entry");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
            StatusCode::OK
        }
        Ok(None) => {
            tracing::debug!(
                pull_request = pr_number,
                "No workflow for pull request, ignoring notification"
            );
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(pull_request = pr_number, error = %e, "Failed to look up workflow");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
