//! HTTP API: queued and synchronous chat relay

mod error;
mod handlers;
mod state;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use state::AppState;

/// Build the router for the chat API
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::submit_chat))
        .route("/api/chat/:task_id", get(handlers::poll_chat))
        .route("/chat", post(handlers::chat_sync))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve the chat API until `shutdown_rx` fires
pub async fn start_server(
    bind_addr: SocketAddr,
    state: AppState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    tracing::info!("Chat API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Chat API shut down gracefully");
    Ok(())
}
