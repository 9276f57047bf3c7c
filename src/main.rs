//! Combat Tracker - initiative, hit point and encounter history engine
//!
//! The server:
//! - Owns the shared combat state and persists it as JSON snapshots
//! - Pushes every change to game master and player viewers over WebSocket
//! - Keeps a saved roster, NPC templates and an archive of finished fights

mod application;
mod domain;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::application::ports::outbound::CombatSnapshotPort;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http;
use crate::infrastructure::state::AppState;
use crate::infrastructure::workers::{persistence_worker, sync_worker, viewer_push_worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "combat_tracker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Combat Tracker");

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Data dir: {}", config.data_dir.display());
    tracing::info!("  Record store: {}", config.database_url());
    tracing::info!("  Sync interval: {:?}", config.sync_interval());

    // Initialize application state
    let state = AppState::new(config).await?;
    let state = Arc::new(state);
    tracing::info!("Application state initialized");

    // Start background workers
    let push_worker = tokio::spawn(viewer_push_worker(state.clone()));
    let save_worker = tokio::spawn(persistence_worker(
        state.combat.clone(),
        state.snapshots.clone(),
    ));
    let poll_worker = tokio::spawn(sync_worker(
        state.combat.clone(),
        state.snapshots.clone(),
        state.config.sync_interval(),
    ));

    tracing::info!("Background workers started");

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server_port));

    // Build the router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(infrastructure::websocket::ws_handler))
        // Merge REST API routes
        .merge(http::create_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start the server
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);

    // Wait for shutdown signal (Ctrl+C)
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received, stopping workers...");
            push_worker.abort();
            save_worker.abort();
            poll_worker.abort();
            tracing::info!("Workers stopped");
        }
    }

    // The persistence worker may have been stopped mid-queue
    let last = state.combat.snapshot().await;
    if let Err(e) = state.snapshots.save_combat(&last).await {
        tracing::error!("Failed to save final combat state: {}", e);
    }

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
