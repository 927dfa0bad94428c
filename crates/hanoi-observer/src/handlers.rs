//! REST handlers for liveness and configuration discovery.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    /// Greeting naming the application.
    pub message: String,
    /// Crate version.
    pub version: &'static str,
    /// Always `healthy`.
    pub status: &'static str,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `healthy`.
    pub status: &'static str,
    /// Application name.
    pub service: String,
}

/// Body of `GET /info`.
#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    /// Application name.
    pub app_name: String,
    /// Attempt cap per demo run.
    pub max_moves: u32,
    /// Configured initial cadence, in seconds.
    pub default_speed: f64,
    /// Disks in a new puzzle.
    pub num_disks: u32,
    /// Strategy driving the demo.
    pub strategy: &'static str,
    /// Connection idle timeout, in seconds.
    pub websocket_timeout: u64,
    /// Live `WebSocket` connections.
    pub connected_clients: usize,
    /// When the current or most recent demo run started.
    pub last_run_started_at: Option<DateTime<Utc>>,
    /// How the most recent demo run ended, if it has.
    pub last_run_outcome: Option<&'static str>,
}

/// Service banner.
///
/// # Route
///
/// `GET /`
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(IndexResponse {
        message: format!("Welcome to {}", state.config.app_name),
        version: env!("CARGO_PKG_VERSION"),
        status: "healthy",
    })
}

/// Liveness probe.
///
/// # Route
///
/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: state.config.app_name.clone(),
    })
}

/// Effective configuration.
///
/// # Route
///
/// `GET /info`
pub async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    Json(InfoResponse {
        app_name: config.app_name.clone(),
        max_moves: config.max_moves,
        default_speed: config.default_speed.as_secs_f64(),
        num_disks: config.n_disks,
        strategy: state.demo.strategy_name(),
        websocket_timeout: config.websocket_timeout.as_secs(),
        connected_clients: state.hub.connection_count(),
        last_run_started_at: state.demo.started_at(),
        last_run_outcome: state.demo.last_outcome().map(|outcome| outcome.as_str()),
    })
}
