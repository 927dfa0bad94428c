//! `WebSocket` handler for the session protocol.
//!
//! Clients connect to `GET /ws`. Each connection registers a bounded
//! queue with the hub; a writer task drains that queue to the socket while
//! the reader loop feeds inbound text frames to the session handler. Either
//! side ending tears the connection down and removes it from the hub.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use hanoi_core::hub::{Connection, CONNECTION_QUEUE_CAPACITY};
use tracing::debug;

use crate::error::ProtocolError;
use crate::session;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register with the hub, pump frames
/// both ways, and unregister when either direction ends.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (connection, mut outbound) = Connection::new(CONNECTION_QUEUE_CAPACITY);
    let id = connection.id();
    state.hub.connect(connection);

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(String::from(&*frame).into())).await.is_err() {
                debug!(conn_id = %id, "WebSocket send failed");
                return;
            }
        }
        // Queue closed: the hub dropped this connection.
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session::handle_text(&state, id, text.as_str());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        session::reject(&state, id, &ProtocolError::NotText);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(conn_id = %id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(conn_id = %id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by the protocol layer.
                    }
                }
            }
            _ = &mut writer => {
                debug!(conn_id = %id, "WebSocket writer finished");
                break;
            }
        }
    }

    state.hub.disconnect(id);
    writer.abort();
}
