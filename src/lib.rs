pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod platform;
pub mod queue;
pub mod server;
pub mod shutdown;
pub mod store;
pub mod webhook;
pub mod workflow;
