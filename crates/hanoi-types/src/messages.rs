//! Inbound command envelope and outbound server messages.
//!
//! Every frame on the `WebSocket` is a single JSON object. Inbound frames
//! carry a case-insensitive `type` plus command-specific fields. Outbound
//! frames are `{"type": ..., "data": {...}}`, except `demo_started`, which
//! carries `initial_state` at the top level where the dashboard reads it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::puzzle::{PegIndex, PuzzleSnapshot};

/// Layer name to activation vector, as reported by a strategy.
pub type ActivationMap = BTreeMap<String, Vec<f64>>;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Envelope of a client command.
///
/// Only `type` is required at the envelope level. Unknown fields are
/// ignored so older dashboards keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ClientEnvelope {
    /// Command name, matched case-insensitively.
    #[serde(rename = "type")]
    pub kind: String,
    /// New cadence in seconds, used by `set_speed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub speed: Option<f64>,
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// Payload carrying a single human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MessageData {
    /// The message text.
    pub message: String,
}

/// The move a strategy suggested, with its confidence breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MovePrediction {
    /// Suggested source peg.
    pub from_tower: PegIndex,
    /// Suggested destination peg.
    pub to_tower: PegIndex,
    /// Joint confidence of the suggestion in `[0, 1]`.
    pub confidence: f64,
    /// Probability of each peg being the source.
    pub from_probabilities: Vec<f64>,
    /// Probability of each peg being the destination.
    pub to_probabilities: Vec<f64>,
}

/// Payload of `ai_thinking`: the state the strategy looked at and what it
/// decided, sent before the move is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ThinkingData {
    /// Pegs as the strategy saw them.
    pub game_state: PuzzleSnapshot,
    /// Per-layer diagnostic activations.
    pub neural_activations: ActivationMap,
    /// The suggested move.
    pub predicted_move: MovePrediction,
    /// 1-based index of the step about to be attempted.
    pub move_number: u32,
    /// The encoded state vector fed to the strategy.
    pub encoded_state: Vec<f64>,
}

/// Payload of `ai_move`: the outcome of one attempted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoveData {
    /// Source peg of the attempt.
    pub from_tower: PegIndex,
    /// Destination peg of the attempt.
    pub to_tower: PegIndex,
    /// Pegs after the move. Absent when the move was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub new_state: Option<PuzzleSnapshot>,
    /// Whether the move was legal and applied.
    pub valid: bool,
    /// Why the move was rejected. Absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub reason: Option<String>,
    /// Attempts made so far in this run, including rejected ones.
    pub move_count: u32,
}

/// Payload of `ai_victory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VictoryData {
    /// Attempts it took, including rejected ones.
    pub total_moves: u32,
    /// Wall-clock seconds since the run started.
    pub total_time: f64,
}

/// Payload of `game_reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameResetData {
    /// The freshly stacked pegs.
    pub state: PuzzleSnapshot,
}

/// Payload of `status_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusData {
    /// Whether the demo step loop is running.
    pub ai_running: bool,
    /// Whether the game-lifecycle service considers a game in progress.
    pub game_running: bool,
    /// Current cadence in seconds.
    pub current_speed: f64,
    /// Current pegs.
    pub game_state: PuzzleSnapshot,
    /// Number of live connections.
    pub connected_clients: usize,
}

// ---------------------------------------------------------------------------
// Outbound envelope
// ---------------------------------------------------------------------------

/// Every message the server can send to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// A protocol, precondition, or simulation error.
    Error {
        /// Error details.
        data: MessageData,
    },
    /// A demo run has started.
    DemoStarted {
        /// Pegs at the start of the run.
        initial_state: PuzzleSnapshot,
    },
    /// The strategy has chosen its next move.
    AiThinking {
        /// Diagnostics for the upcoming step.
        data: ThinkingData,
    },
    /// A move was attempted.
    AiMove {
        /// Outcome of the attempt.
        data: MoveData,
    },
    /// The puzzle was solved.
    AiVictory {
        /// Totals for the run.
        data: VictoryData,
    },
    /// A client stopped the demo.
    DemoStopped {
        /// Stop notice.
        data: MessageData,
    },
    /// A client reset the game.
    GameReset {
        /// The new pegs.
        data: GameResetData,
    },
    /// Reply to `get_status`.
    StatusUpdate {
        /// Current system status.
        data: StatusData,
    },
}

impl ServerMessage {
    /// Build an `error` message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            data: MessageData {
                message: message.into(),
            },
        }
    }

    /// Build a `demo_stopped` message.
    pub fn demo_stopped(message: impl Into<String>) -> Self {
        Self::DemoStopped {
            data: MessageData {
                message: message.into(),
            },
        }
    }

    /// The wire `type` tag, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::DemoStarted { .. } => "demo_started",
            Self::AiThinking { .. } => "ai_thinking",
            Self::AiMove { .. } => "ai_move",
            Self::AiVictory { .. } => "ai_victory",
            Self::DemoStopped { .. } => "demo_stopped",
            Self::GameReset { .. } => "game_reset",
            Self::StatusUpdate { .. } => "status_update",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn to_value(msg: &ServerMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    fn initial() -> PuzzleSnapshot {
        PuzzleSnapshot([vec![4, 3, 2, 1], Vec::new(), Vec::new()])
    }

    #[test]
    fn envelope_accepts_mixed_case_and_extra_fields() {
        let env: ClientEnvelope =
            serde_json::from_str(r#"{"type":"Set_Speed","speed":0.5,"extra":true}"#).unwrap();
        assert_eq!(env.kind, "Set_Speed");
        assert_eq!(env.speed, Some(0.5));
    }

    #[test]
    fn envelope_without_type_is_rejected() {
        let parsed: Result<ClientEnvelope, _> = serde_json::from_str(r#"{"speed":1.0}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn demo_started_carries_state_at_top_level() {
        let msg = ServerMessage::DemoStarted {
            initial_state: initial(),
        };
        assert_eq!(
            to_value(&msg),
            json!({"type": "demo_started", "initial_state": [[4, 3, 2, 1], [], []]})
        );
    }

    #[test]
    fn error_wraps_message_in_data() {
        let msg = ServerMessage::error("Speed value required");
        assert_eq!(
            to_value(&msg),
            json!({"type": "error", "data": {"message": "Speed value required"}})
        );
    }

    #[test]
    fn rejected_move_omits_new_state() {
        let msg = ServerMessage::AiMove {
            data: MoveData {
                from_tower: 1,
                to_tower: 2,
                new_state: None,
                valid: false,
                reason: Some(String::from("Invalid move attempted")),
                move_count: 3,
            },
        };
        let value = to_value(&msg);
        assert_eq!(value["type"], "ai_move");
        assert!(value["data"].get("new_state").is_none());
        assert_eq!(value["data"]["valid"], false);
        assert_eq!(value["data"]["reason"], "Invalid move attempted");
        assert_eq!(value["data"]["move_count"], 3);
    }

    #[test]
    fn accepted_move_omits_reason() {
        let msg = ServerMessage::AiMove {
            data: MoveData {
                from_tower: 0,
                to_tower: 1,
                new_state: Some(PuzzleSnapshot([vec![4, 3, 2], vec![1], Vec::new()])),
                valid: true,
                reason: None,
                move_count: 1,
            },
        };
        let value = to_value(&msg);
        assert!(value["data"].get("reason").is_none());
        assert_eq!(value["data"]["new_state"], json!([[4, 3, 2], [1], []]));
    }

    #[test]
    fn status_update_field_names() {
        let msg = ServerMessage::StatusUpdate {
            data: StatusData {
                ai_running: false,
                game_running: true,
                current_speed: 1.0,
                game_state: initial(),
                connected_clients: 2,
            },
        };
        let value = to_value(&msg);
        assert_eq!(value["type"], "status_update");
        for key in [
            "ai_running",
            "game_running",
            "current_speed",
            "game_state",
            "connected_clients",
        ] {
            assert!(value["data"].get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let messages = [
            ServerMessage::error("x"),
            ServerMessage::demo_stopped("y"),
            ServerMessage::GameReset {
                data: GameResetData { state: initial() },
            },
            ServerMessage::AiVictory {
                data: VictoryData {
                    total_moves: 15,
                    total_time: 2.5,
                },
            },
        ];
        for msg in &messages {
            assert_eq!(to_value(msg)["type"], msg.kind());
        }
    }
}
