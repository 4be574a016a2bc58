use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::platform::github::GitHubRemote;
use crate::queue::TaskQueue;
use crate::store::FileStore;

pub struct AppState {
    pub config: AppConfig,
    pub remote: GitHubRemote,
    pub store: FileStore,
    pub task_queue: RwLock<TaskQueue>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let remote = GitHubRemote::new(&config.github)?;
        let store = FileStore::new(&config.store.data_dir)?;
        let task_queue = RwLock::new(TaskQueue::new());

        Ok(Self {
            config,
            remote,
            store,
            task_queue,
        })
    }
}

/// Ownership requirement of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    /// No authentication required.
    Public,
    /// Caller must present a valid `Authorization: Token <t>` header.
    RequiresOwner,
}

/// One entry of the static route table.
///
/// `acl` is optional only so that forgetting the declaration is
/// representable; `validate_routes` turns that omission into a startup
/// error before the service accepts traffic.
pub struct RouteSpec {
    pub method: &'static str,
    pub path: &'static str,
    pub acl: Option<Acl>,
}

pub const ROUTES: &[RouteSpec] = &[
    RouteSpec {
        method: "POST",
        path: "/pods",
        acl: Some(Acl::RequiresOwner),
    },
    RouteSpec {
        method: "GET",
        path: "/pods/:name/versions/:version",
        acl: Some(Acl::Public),
    },
    RouteSpec {
        method: "POST",
        path: "/travis-build-hook",
        acl: Some(Acl::Public),
    },
    RouteSpec {
        method: "GET",
        path: "/health",
        acl: Some(Acl::Public),
    },
];

pub fn validate_routes(routes: &[RouteSpec]) -> Result<()> {
    for route in routes {
        if route.acl.is_none() {
            return Err(AppError::Config(format!(
                "Route {} {} does not declare an ACL rule",
                route.method, route.path
            )));
        }
    }
    Ok(())
}

/// ACL declared for a route, looked up by the handlers that enforce it.
pub fn acl_for(method: &str, path: &str) -> Option<Acl> {
    ROUTES
        .iter()
        .find(|r| r.method == method && r.path == path)
        .and_then(|r| r.acl)
}

pub fn create_router(state: Arc<AppState>) -> Result<Router> {
    validate_routes(ROUTES)?;

    Ok(Router::new()
        .route("/pods", post(crate::api::submit_pod))
        .route(
            "/pods/:name/versions/:version",
            get(crate::api::pod_version_status),
        )
        .route(
            "/travis-build-hook",
            post(crate::webhook::handler::handle_build_notification),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_route_table_declares_all_acls() {
        assert!(validate_routes(ROUTES).is_ok());
    }

    #[test]
    fn missing_acl_declaration_is_a_startup_error() {
        let routes = [RouteSpec {
            method: "POST",
            path: "/pods",
            acl: None,
        }];
        assert!(matches!(
            validate_routes(&routes),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn submissions_require_an_owner() {
        assert_eq!(acl_for("POST", "/pods"), Some(Acl::RequiresOwner));
        assert_eq!(acl_for("GET", "/health"), Some(Acl::Public));
        assert_eq!(acl_for("DELETE", "/pods"), None);
    }
}
