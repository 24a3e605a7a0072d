//! Cal.com webhook sink binary.
//!
//! Standalone HTTP service relaying Cal.com booking events into Todoist.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cal_sink::config::Config;
use cal_sink::dispatch::Dispatcher;
use cal_sink::server::{self, AppState};
use cal_sink::store::FileStore;
use cal_sink::todoist::TodoistClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("cal_sink=info".parse()?))
        .init();

    info!("Starting cal-sink service...");

    // Load configuration
    let config = Config::default();

    if config.webhook_secret.is_none() {
        warn!("CALCOM_WEBHOOK_SECRET not configured - webhook signatures will not be checked");
    }

    // Initialize Todoist client (constructed once, reused for the process lifetime)
    let token = config
        .todoist_token
        .clone()
        .context("TODOIST_API_TOKEN environment variable is required")?;
    let todoist = TodoistClient::new(&token, config.todoist_project_id.clone())
        .context("Failed to create Todoist client")?;
    info!("Todoist API client configured");

    // Initialize the mapping store
    let store = FileStore::new(&config.mappings_path);
    info!(
        path = %config.mappings_path.display(),
        "Using file-backed mapping store"
    );

    let port = config.port;
    let dispatcher = Dispatcher::new(Arc::new(store), Arc::new(todoist));

    // Build application state and router
    let state = AppState {
        config: Arc::new(config),
        dispatcher: Arc::new(dispatcher),
    };
    let app = server::build_router(state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port, "cal-sink listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
