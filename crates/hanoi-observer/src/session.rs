//! Session protocol: decoding client frames and dispatching commands.
//!
//! Every inbound text frame is decoded into a [`Command`] and run against
//! the shared [`AppState`]. Any failure becomes exactly one `error` reply
//! to the sender; nothing is broadcast and the connection stays open.
//!
//! | Command         | Effect                                              |
//! |-----------------|-----------------------------------------------------|
//! | `start_ai_demo` | new game, start the demo (`demo_started` to all)     |
//! | `set_speed`     | change the cadence, no reply                         |
//! | `stop_demo`     | stop the demo (`demo_stopped` to all)                |
//! | `reset_game`    | stop the demo, reset pegs (`game_reset` to all)      |
//! | `get_status`    | `status_update` to the sender only                   |

use hanoi_core::game::lock;
use hanoi_types::{ClientEnvelope, ConnectionId, GameResetData, ServerMessage};
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::state::AppState;

/// Notice broadcast when a client stops the demo.
pub const STOPPED_BY_USER: &str = "AI demo stopped by user";

/// A decoded client command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Create a fresh game and start the demo on it.
    StartAiDemo,
    /// Change the cadence, in seconds.
    SetSpeed(f64),
    /// Stop the demo.
    StopDemo,
    /// Stop the demo and reset the pegs.
    ResetGame,
    /// Report status to the sender.
    GetStatus,
}

impl Command {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] when the frame is not a JSON
    /// object with a string `type`, [`ProtocolError::UnknownCommand`] for an
    /// unrecognized `type`, and [`ProtocolError::MissingSpeed`] for a
    /// `set_speed` without a `speed`.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: ClientEnvelope =
            serde_json::from_str(text).map_err(ProtocolError::Malformed)?;
        Self::from_envelope(envelope)
    }

    /// Interpret an already-parsed envelope.
    ///
    /// # Errors
    ///
    /// See [`Command::decode`].
    pub fn from_envelope(envelope: ClientEnvelope) -> Result<Self, ProtocolError> {
        match envelope.kind.to_ascii_lowercase().as_str() {
            "start_ai_demo" => Ok(Self::StartAiDemo),
            "set_speed" => envelope
                .speed
                .map(Self::SetSpeed)
                .ok_or(ProtocolError::MissingSpeed),
            "stop_demo" => Ok(Self::StopDemo),
            "reset_game" => Ok(Self::ResetGame),
            "get_status" => Ok(Self::GetStatus),
            _ => Err(ProtocolError::UnknownCommand(envelope.kind)),
        }
    }
}

/// Handle one inbound text frame from connection `from`.
///
/// Failures are reported to the sender only.
pub fn handle_text(state: &AppState, from: ConnectionId, text: &str) {
    let result = Command::decode(text).and_then(|command| {
        debug!(conn_id = %from, ?command, "command received");
        dispatch(state, from, command)
    });
    if let Err(e) = result {
        reject(state, from, &e);
    }
}

/// Reply to connection `from` with the `error` for `error`.
pub fn reject(state: &AppState, from: ConnectionId, error: &ProtocolError) {
    warn!(conn_id = %from, error = %error, "command rejected");
    let _ = state.hub.send_to(from, &ServerMessage::error(error.to_string()));
}

/// Run a decoded command on behalf of connection `from`.
///
/// # Errors
///
/// Returns [`ProtocolError::Demo`] when `start_ai_demo` arrives while a
/// run is live; the current game is left untouched in that case.
pub fn dispatch(state: &AppState, from: ConnectionId, command: Command) -> Result<(), ProtocolError> {
    match command {
        Command::StartAiDemo => {
            // The game is only replaced by the start that wins the race.
            state.demo.start_with(|| {
                let puzzle = state.games.create_new_game();
                state.games.start_game();
                puzzle
            })?;
            info!(conn_id = %from, "AI demo started by client");
        }
        Command::SetSpeed(seconds) => {
            let _ = state.demo.set_speed(seconds);
        }
        Command::StopDemo => {
            let _ = state.demo.stop();
            state.games.stop_game();
            let _ = state.hub.broadcast(&ServerMessage::demo_stopped(STOPPED_BY_USER));
            info!(conn_id = %from, "AI demo stopped by client");
        }
        Command::ResetGame => {
            let _ = state.demo.stop();
            let puzzle = state.games.reset_game();
            let snapshot = lock(&puzzle).snapshot();
            let _ = state.hub.broadcast(&ServerMessage::GameReset {
                data: GameResetData { state: snapshot },
            });
            info!(conn_id = %from, "game reset by client");
        }
        Command::GetStatus => {
            let _ = state.hub.send_to(
                from,
                &ServerMessage::StatusUpdate {
                    data: state.status(),
                },
            );
        }
    }
    Ok(())
}
