//! Server main loop

use crate::routes;
use anyhow::Result;
use app_core::AppState;
use tokio::net::TcpListener;

/// Bind the configured address and serve until Ctrl+C
pub async fn run(state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&state.config.server.bind).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
    }
}
