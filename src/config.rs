use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub webhook: WebhookConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    /// Specs repository in `owner/name` form.
    pub repo: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    pub token: String,
    /// Token accepted on `Authorization: Token <t>` for submissions.
    pub owner_token: String,
}

// Manual Debug impl to avoid leaking tokens
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("repo", &self.repo)
            .field("base_branch", &self.base_branch)
            .field("token", &"[REDACTED]")
            .field("owner_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct WebhookConfig {
    /// Shared secret for the Travis build-notification token.
    pub travis_token: String,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("travis_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Delay before a failed workflow step is retried.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_base_branch() -> String {
    "master".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/podrelay")
}

fn default_retry_delay_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            // Try default paths
            builder = builder.add_source(
                config::File::with_name("podrelay")
                    .required(false),
            );
        }

        // Environment variable overrides with PODRELAY_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PODRELAY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn travis_token(&self) -> &str {
        &self.webhook.travis_token
    }

    pub fn owner_token(&self) -> &str {
        &self.github.owner_token
    }
}
