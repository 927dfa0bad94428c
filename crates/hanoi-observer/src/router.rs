//! Axum router construction for the demo server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS restricted to the configured dashboard origins.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the demo server.
///
/// The router includes:
/// - `GET /` -- service banner
/// - `GET /health` -- liveness probe
/// - `GET /info` -- effective configuration
/// - `GET /ws` -- `WebSocket` session
///
/// Only origins listed in `ALLOWED_ORIGINS` may make cross-origin
/// requests; credentials are allowed for them.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .route("/ws", get(ws::ws_session))
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, "ignoring invalid CORS origin: {e}");
                None
            }
        })
        .collect();

    // Wildcard methods and headers cannot be combined with credentials,
    // so mirror the request instead.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
