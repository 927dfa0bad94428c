//! Demo server for the Tower of Hanoi AI visualizer.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) carrying the JSON session protocol:
//!   clients send commands and every client receives the demo's event
//!   stream through the shared [`Hub`](hanoi_core::hub::Hub)
//! - **REST endpoints** (`/`, `/health`, `/info`) for liveness probes and
//!   configuration discovery
//!
//! # Architecture
//!
//! [`AppState`] owns one hub, one game service, and one demo
//! orchestrator shared by every connection. Each socket task registers a
//! queue with the hub, forwards inbound text frames to
//! [`session::handle_text`], and drains its queue to the socket.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::{ProtocolError, ServerError};
pub use router::build_router;
pub use server::{serve, start_server};
pub use state::AppState;
