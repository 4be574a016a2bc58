use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote repository call failed: {0}")]
    RemoteCall(String),

    #[error("Concurrent modification of workflow {0}")]
    Conflict(uuid::Uuid),

    #[error("{0} {1} has already been submitted")]
    Duplicate(String, String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::RemoteCall(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
