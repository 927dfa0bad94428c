//! Error types for the demo server.
//!
//! [`ProtocolError`] covers everything that can go wrong with a single
//! client command. Its `Display` text is exactly what the client sees in
//! the `error` reply, so the wording is part of the wire protocol.

use hanoi_core::demo::DemoError;

/// A client command that could not be carried out.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was not a JSON object with a string `type`.
    #[error("Invalid message format")]
    Malformed(#[source] serde_json::Error),

    /// The frame was not text.
    #[error("Invalid message format")]
    NotText,

    /// The command name is not recognized.
    #[error("Unknown message type: {0}")]
    UnknownCommand(String),

    /// `set_speed` arrived without a numeric `speed`.
    #[error("Speed value required")]
    MissingSpeed,

    /// The orchestrator refused the command.
    #[error(transparent)]
    Demo(#[from] DemoError),
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
