//! Server binary for the Tower of Hanoi AI visualizer.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Build the strategy, hub, game service, and demo orchestrator
//! 4. Serve HTTP and `WebSocket` traffic until `Ctrl-C`
//! 5. Stop any running demo and drain in-flight requests

mod error;

use std::sync::Arc;

use hanoi_core::config::DemoConfig;
use hanoi_observer::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot
/// bind or serve.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    init_tracing();

    info!("hanoi-server starting");

    run().await?;

    info!("hanoi-server stopped");
    Ok(())
}

async fn run() -> Result<(), AppError> {
    // 2. Load configuration.
    let config = DemoConfig::from_env()?;
    info!(
        app_name = config.app_name,
        host = config.host,
        port = config.port,
        max_moves = config.max_moves,
        default_speed_ms = u64::try_from(config.default_speed.as_millis()).unwrap_or(u64::MAX),
        n_disks = config.n_disks,
        strategy = config.strategy.as_str(),
        "Configuration loaded"
    );

    // 3. Build shared state.
    let state = Arc::new(AppState::new(config.clone()));
    info!(strategy = state.demo.strategy_name(), "Demo orchestrator ready");

    // 4. Serve until Ctrl-C, then 5. stop the demo.
    let demo = Arc::clone(&state.demo);
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        if demo.stop() {
            info!("Running demo stopped for shutdown");
        }
    };

    hanoi_observer::start_server(&config, state, shutdown).await?;
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` sets the filter (default
/// `info`); `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
