//! Connection registry with best-effort fan-out.
//!
//! Each live subscriber is represented by a [`Connection`]: an identifier
//! plus the sending half of a bounded queue. The `WebSocket` task owns the
//! receiving half and writes whatever arrives to the socket, so per
//! connection delivery is FIFO.
//!
//! Delivery is at-most-once and never retried. A connection whose queue is
//! closed (the socket task is gone) or full (the client stopped reading)
//! is dropped from the registry on the spot; the failure is logged and
//! never surfaced to the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use hanoi_types::{ConnectionId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-connection queue capacity.
///
/// A client that falls this far behind is treated as dead.
pub const CONNECTION_QUEUE_CAPACITY: usize = 256;

/// A serialized frame ready to write to a socket.
pub type Frame = Arc<str>;

/// Handle to one subscriber.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
}

impl Connection {
    /// Create a connection with a fresh id and its receiving queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    /// The connection's stable identity.
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    fn deliver(&self, frame: &Frame) -> bool {
        self.tx.try_send(Arc::clone(frame)).is_ok()
    }
}

/// The set of live connections.
///
/// All methods take the registry lock for their whole duration and never
/// await while holding it, so a broadcast is observed by every
/// connection at the same position in its queue.
#[derive(Debug, Default)]
pub struct Hub {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
}

impl Hub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection.
    pub fn connect(&self, connection: Connection) {
        let id = connection.id();
        let mut conns = self.registry();
        let _ = conns.insert(id, connection);
        info!(conn_id = %id, total = conns.len(), "client connected");
    }

    /// Remove a connection. No-op if it is already gone.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut conns = self.registry();
        if conns.remove(&id).is_some() {
            info!(conn_id = %id, total = conns.len(), "client disconnected");
        }
    }

    /// Send `message` to a single connection.
    ///
    /// Returns whether the frame was queued. On failure the connection is
    /// removed.
    pub fn send_to(&self, id: ConnectionId, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        let mut conns = self.registry();
        let Some(conn) = conns.get(&id) else {
            debug!(conn_id = %id, kind = message.kind(), "send to unknown connection dropped");
            return false;
        };
        if conn.deliver(&frame) {
            return true;
        }
        warn!(conn_id = %id, kind = message.kind(), "send failed, dropping client");
        let _ = conns.remove(&id);
        false
    }

    /// Send `message` to every registered connection.
    ///
    /// A failing connection does not stop delivery to the rest; every
    /// connection that failed during the pass is removed afterwards.
    /// Returns the number of connections the frame was queued for.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let Some(frame) = encode(message) else {
            return 0;
        };
        let mut conns = self.registry();
        let mut failed = Vec::new();
        let mut delivered: usize = 0;
        for conn in conns.values() {
            if conn.deliver(&frame) {
                delivered = delivered.saturating_add(1);
            } else {
                failed.push(conn.id());
            }
        }
        for id in &failed {
            warn!(conn_id = %id, kind = message.kind(), "broadcast failed, dropping client");
            let _ = conns.remove(id);
        }
        debug!(kind = message.kind(), recipients = delivered, "broadcast");
        delivered
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.registry().len()
    }
}

fn encode(message: &ServerMessage) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!(kind = message.kind(), error = %e, "failed to serialize message");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    #[test]
    fn connect_and_disconnect_track_count() {
        let hub = Hub::new();
        let (a, _rx_a) = Connection::new(8);
        let (b, _rx_b) = Connection::new(8);
        let a_id = a.id();
        hub.connect(a);
        hub.connect(b);
        assert_eq!(hub.connection_count(), 2);

        hub.disconnect(a_id);
        assert_eq!(hub.connection_count(), 1);
        hub.disconnect(a_id);
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn send_to_reaches_only_target() {
        let hub = Hub::new();
        let (a, mut rx_a) = Connection::new(8);
        let (b, mut rx_b) = Connection::new(8);
        let a_id = a.id();
        hub.connect(a);
        hub.connect(b);

        assert!(hub.send_to(a_id, &ServerMessage::error("only you")));
        let got = drain(&mut rx_a);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0]["data"]["message"], "only you");
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn send_to_failure_removes_connection_silently() {
        let hub = Hub::new();
        let (a, rx_a) = Connection::new(8);
        let a_id = a.id();
        hub.connect(a);
        drop(rx_a);

        assert!(!hub.send_to(a_id, &ServerMessage::error("gone")));
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn broadcast_isolates_one_failing_connection() {
        let hub = Hub::new();
        let mut receivers = Vec::new();
        for _ in 0..4 {
            let (conn, rx) = Connection::new(8);
            hub.connect(conn);
            receivers.push(rx);
        }
        let (dead, dead_rx) = Connection::new(8);
        hub.connect(dead);
        drop(dead_rx);

        let first = ServerMessage::error("first");
        let second = ServerMessage::demo_stopped("second");
        assert_eq!(hub.broadcast(&first), 4);
        assert_eq!(hub.connection_count(), 4);
        assert_eq!(hub.broadcast(&second), 4);

        for rx in &mut receivers {
            let got = drain(rx);
            assert_eq!(got.len(), 2);
            assert_eq!(got[0]["type"], "error");
            assert_eq!(got[1]["type"], "demo_stopped");
        }
    }

    #[test]
    fn full_queue_counts_as_failure() {
        let hub = Hub::new();
        let (slow, _slow_rx) = Connection::new(1);
        hub.connect(slow);

        assert_eq!(hub.broadcast(&ServerMessage::error("one")), 1);
        assert_eq!(hub.broadcast(&ServerMessage::error("two")), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn broadcast_with_no_connections_is_fine() {
        let hub = Hub::new();
        assert_eq!(hub.broadcast(&ServerMessage::error("nobody")), 0);
    }
}
