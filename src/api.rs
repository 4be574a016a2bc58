use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, AuthError};
use crate::error::AppError;
use crate::queue::task::Task;
use crate::server::{acl_for, Acl, AppState};
use crate::store::WorkflowStore;
use crate::workflow::{PodVersion, SubmissionWorkflow};

/// JSON error responses at the HTTP boundary.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    UnsupportedMediaType(String),
    /// Field-level validation errors, rendered as a 422.
    Validation(BTreeMap<String, Vec<String>>),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            ApiError::UnsupportedMediaType(message) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                json!({ "error": message }),
            ),
            ApiError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": errors }))
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "An internal server error occurred. Please try again later." }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        // Internal detail goes to the log, not the response.
        tracing::error!(error = %e, "Request failed with internal error");
        ApiError::Internal
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => {
                ApiError::Unauthorized("Please supply an authentication token.".to_string())
            }
            AuthError::InvalidToken => ApiError::Unauthorized(
                "Authentication token is invalid or unverified.".to_string(),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitPodRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub specification: String,
}

impl SubmitPodRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut add = |field: &str, message: &str| {
            errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        };

        for (field, value) in [("name", &self.name), ("version", &self.version)] {
            if value.is_empty() {
                add(field, "is not present");
            } else if value.contains('/') || value.chars().any(char::is_whitespace) {
                add(field, "contains disallowed characters");
            }
        }
        if self.url.is_empty() {
            add("url", "is not present");
        }
        if self.specification.is_empty() {
            add("specification", "is not present");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    fn into_pod_version(self) -> PodVersion {
        PodVersion {
            name: self.name,
            version: self.version,
            url: self.url,
            specification: self.specification,
        }
    }
}

fn require_json_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_string())
        .unwrap_or_default();

    if media_type != "application/json" {
        return Err(ApiError::UnsupportedMediaType(format!(
            "Unable to accept input with Content-Type `{media_type}`, must be `application/json`."
        )));
    }
    Ok(())
}

/// `POST /pods` — accept a podspec submission and start its workflow.
pub async fn submit_pod(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if acl_for("POST", "/pods") == Some(Acl::RequiresOwner) {
        auth::require_owner(state.config.owner_token(), &headers)?;
    }

    require_json_content_type(&headers)?;

    let request: SubmitPodRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON data provided.".to_string()))?;
    request.validate()?;

    // Duplicate detection happens inside the store's create, atomically
    // with the write; a racing submission of the same pod gets the 409.
    let pod = request.into_pod_version();
    let workflow = match SubmissionWorkflow::create(pod, &state.store).await {
        Ok(workflow) => workflow,
        Err(AppError::Duplicate(name, version)) => {
            return Err(ApiError::Conflict(format!(
                "{name} {version} has already been submitted."
            )));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        workflow = %workflow.id,
        pod = %workflow.pod.name,
        version = %workflow.pod.version,
        "Accepted submission"
    );

    let task = Task {
        workflow_id: workflow.id,
        pod: format!("{} {}", workflow.pod.name, workflow.pod.version),
    };
    {
        let mut queue = state.task_queue.write().await;
        queue.enqueue(task);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "workflow_id": workflow.id,
            "name": workflow.pod.name,
            "version": workflow.pod.version,
        })),
    ))
}

/// `GET /pods/:name/versions/:version` — submission progress and audit log.
pub async fn pod_version_status(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let workflow = state
        .store
        .find_by_pod(&name, &version)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No submission for {name} {version}.")))?;

    let logs = state.store.logs(workflow.id).await?;

    Ok(Json(json!({
        "workflow_id": workflow.id,
        "name": workflow.pod.name,
        "version": workflow.pod.version,
        "complete": workflow.is_complete(),
        "pull_request_number": workflow.pull_request_number,
        "created_at": workflow.created_at,
        "updated_at": workflow.updated_at,
        "log": logs
            .iter()
            .map(|entry| json!({
                "message": entry.message,
                "created_at": entry.created_at,
            }))
            .collect::<Vec<_>>(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, version: &str) -> SubmitPodRequest {
        SubmitPodRequest {
            name: name.to_string(),
            version: version.to_string(),
            url: "http://example.com/AFNetworking".to_string(),
            specification: "{}".to_string(),
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(request("AFNetworking", "1.0.0").validate().is_ok());
    }

    #[test]
    fn empty_fields_collect_per_field_errors() {
        let bad = SubmitPodRequest {
            name: String::new(),
            version: String::new(),
            url: String::new(),
            specification: String::new(),
        };
        match bad.validate().unwrap_err() {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 4);
                assert_eq!(errors["name"], vec!["is not present"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn slashes_and_whitespace_are_rejected() {
        assert!(request("AF/Networking", "1.0.0").validate().is_err());
        assert!(request("AFNetworking", "1.0 .0").validate().is_err());
    }

    #[test]
    fn json_content_type_guard() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert!(require_json_content_type(&headers).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(matches!(
            require_json_content_type(&headers),
            Err(ApiError::UnsupportedMediaType(_))
        ));
    }
}
