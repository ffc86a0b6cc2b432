// Wanderpal - chat relay for a travel assistant flow
//
// Accepts chat messages over HTTP and relays them to a remote
// flow-execution service, hiding its endpoint shapes, auth header quirks and
// transient gateway failures from callers.
//
// Architecture:
// - Gateway (reqwest): candidate URLs × auth encodings with retry/backoff
// - Task queue: in-memory submit/poll for long-running chat calls
// - Server (axum): HTTP API over the queue and a synchronous relay

mod cli;
mod config;
mod gateway;
mod server;
mod tasks;
mod util;

use anyhow::{Context, Result};
use config::{Config, LogRotation, LoggingConfig};
use gateway::GatewayClient;
use server::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, ask ...)
    // If a command was handled, exit early
    if cli::handle_cli().await? {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = Config::from_env()?;

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = init_tracing(&config.logging);

    tracing::info!("wanderpal {} starting", config::VERSION);
    tracing::info!("Upstream: {}", config.upstream.describe());

    // Built once here and shared by the sync relay and the task queue
    let gateway = Arc::new(
        GatewayClient::from_config(config.upstream.clone())
            .context("Failed to build upstream client")?,
    );
    let state = AppState::new(gateway);

    if let Some(secs) = config.tasks.retention_secs {
        tracing::info!(retention_secs = secs, "Finished tasks will be swept");
        state.tasks().spawn_sweeper(
            Duration::from_secs(secs),
            Duration::from_secs(config.tasks.sweep_interval_secs.max(1)),
        );
    }

    // Create shutdown channel for graceful server shutdown
    // This is a oneshot channel - it can only send one signal
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let mut server_handle = tokio::spawn(server::start_server(
        config.bind_addr,
        state,
        shutdown_rx,
    ));

    tokio::select! {
        // Server stopped on its own: bind failure or fatal error
        result = &mut server_handle => {
            return result.context("Server task failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
        }
    }

    tracing::info!("Shutting down...");

    // If the send fails, the server has already shut down (which is fine)
    let _ = shutdown_tx.send(());
    server_handle.await.context("Server task failed")??;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Stdout logging plus an optional JSON file layer
///
/// Precedence: RUST_LOG env var > config file > default "info"
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = format!("wanderpal={},axum=info", logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let (file_layer, guard) = if logging.file_enabled {
        match std::fs::create_dir_all(&logging.file_dir) {
            Ok(()) => {
                let file_appender = match logging.file_rotation {
                    LogRotation::Hourly => {
                        tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
                    }
                    LogRotation::Daily => {
                        tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix)
                    }
                    LogRotation::Never => {
                        tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix)
                    }
                };

                // Writes happen on a background thread
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    logging.file_dir, e
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}
