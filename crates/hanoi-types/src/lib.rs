//! Shared wire types for the Tower of Hanoi AI visualizer.
//!
//! This crate is the single source of truth for everything that crosses the
//! `WebSocket` boundary. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for connection identifiers
//! - [`puzzle`] -- Peg snapshot and move types
//! - [`messages`] -- Inbound command envelope and outbound server messages

pub mod ids;
pub mod messages;
pub mod puzzle;

// Re-export all public types at crate root for convenience.
pub use ids::ConnectionId;
pub use messages::{
    ActivationMap, ClientEnvelope, GameResetData, MessageData, MoveData, MovePrediction,
    ServerMessage, StatusData, ThinkingData, VictoryData,
};
pub use puzzle::{Move, PegIndex, PuzzleSnapshot, PEG_COUNT};
