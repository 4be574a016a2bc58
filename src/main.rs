use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podrelay::config::AppConfig;
use podrelay::server::{create_router, AppState};
use podrelay::shutdown::{graceful_shutdown, wait_for_shutdown};

#[derive(Parser)]
#[command(name = "podrelay", about = "Publishes podspec submissions as pull requests")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        repo = %config.github.repo,
        "Starting podrelay server"
    );

    let state = Arc::new(AppState::new(config.clone())?);

    // Start the task queue processor
    let queue_state = Arc::clone(&state);
    tokio::spawn(async move {
        podrelay::queue::run_queue_processor(queue_state).await;
    });

    // Re-enqueue incomplete workflows (resume after restart)
    let scan_state = Arc::clone(&state);
    tokio::spawn(async move {
        podrelay::queue::startup::scan_incomplete_workflows(&scan_state).await;
    });

    // The route table is validated here, before the listener opens.
    let app = create_router(Arc::clone(&state))?;

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        config.server.host, config.server.port
    ))
    .await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    graceful_shutdown(&state).await;

    Ok(())
}
