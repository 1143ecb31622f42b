mod api;
mod config;
mod error;
mod main_lib;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::config::Config;
use crate::main_lib::{build_state, init_tracing, spawn_status_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Starting wallsync-server (data dir {}, interval {}s)",
        config.data_dir,
        config.sync_interval.as_secs()
    );

    let state = build_state(&config).await?;
    let status_logger = spawn_status_logger(&state);

    state.scheduler.start_periodic();
    if config.sync_on_start && state.scheduler.enqueue_immediate().is_none() {
        info!("Startup sync already pending");
    }

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);

    let router = api::app_router(state.clone());
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    state.scheduler.stop_periodic();
    status_logger.abort();
    info!("wallsync-server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
