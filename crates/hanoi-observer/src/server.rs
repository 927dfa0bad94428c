//! Demo HTTP server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until the
//! supplied shutdown future resolves. [`serve`] runs on an existing
//! listener, which lets tests bind an ephemeral port.

use std::future::Future;
use std::sync::Arc;

use hanoi_core::config::DemoConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::ServerError;
use crate::router::build_router;
use crate::state::AppState;

/// Start the demo server on the configured host and port.
///
/// Returns `Ok(())` once `shutdown` resolves and in-flight requests have
/// drained.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(
    config: &DemoConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {}:{}: {e}", config.host, config.port)))?;
    serve(listener, state, shutdown).await
}

/// Serve the router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server encounters a fatal I/O error.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;
    info!(%addr, "demo server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("demo server stopped");
    Ok(())
}
