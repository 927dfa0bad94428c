//! The single shared demo run and its cancellable step loop.
//!
//! [`DemoOrchestrator`] owns the run lifecycle. A start atomically moves the
//! session from any non-running status to [`DemoStatus::Running`] and spawns
//! the step loop on a background task. The loop asks the [`Strategy`] for a
//! move, broadcasts what it is thinking, waits one cadence interval, applies
//! the move, broadcasts the outcome, and waits half an interval before the
//! next step.
//!
//! # Termination
//!
//! The loop ends when the puzzle is solved, when the move cap is reached,
//! when a stop cancels it, or when the strategy fails or panics. Every path
//! goes through one finish step that returns the session to
//! [`DemoStatus::Idle`] and records the [`DemoOutcome`], so a new run can
//! start right away.
//!
//! # Cancellation
//!
//! Each run carries a [`CancellationToken`]. Every wait in the loop races the
//! token against the timer and re-checks it on resume, so a stop requested
//! during a wait aborts the run before any further mutation. The token is
//! checked once more under the puzzle lock, and the move is applied and
//! announced before that lock is released, so a reset that follows a stop
//! never sees a stale move land after it.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hanoi_types::{MoveData, ServerMessage, ThinkingData, VictoryData};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::clamp_speed_ms;
use crate::game::{lock, SharedPuzzle};
use crate::hub::Hub;
use crate::strategy::{Strategy, StrategyError, Suggestion};

/// Reason attached to rejected moves.
pub const INVALID_MOVE_REASON: &str = "Invalid move attempted";

/// Lifecycle of the shared demo session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoStatus {
    /// No run is live. A run that ends for any reason lands here.
    Idle,
    /// The step loop is live.
    Running,
    /// A stop was requested and the step loop is unwinding.
    Stopping,
}

/// How a run ended.
///
/// A run that ends on its own is finished; the session still drops straight
/// back to [`DemoStatus::Idle`] and the outcome is kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoOutcome {
    /// The puzzle was solved after `moves` attempts.
    Solved {
        /// Attempts made, including rejected ones.
        moves: u32,
    },
    /// The move cap was reached without solving.
    MoveCapReached {
        /// Attempts made.
        moves: u32,
    },
    /// A stop cancelled the run.
    Stopped,
    /// The strategy failed or the step task panicked.
    Faulted {
        /// What went wrong.
        message: String,
    },
}

impl DemoOutcome {
    /// Short label used in logs and `/info`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Solved { .. } => "solved",
            Self::MoveCapReached { .. } => "move_cap_reached",
            Self::Stopped => "stopped",
            Self::Faulted { .. } => "faulted",
        }
    }
}

/// Errors returned to the caller of [`DemoOrchestrator::start`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DemoError {
    /// A run is already in progress.
    #[error("AI demo already running")]
    AlreadyRunning,
}

/// Book-keeping for one run.
#[derive(Debug)]
struct Run {
    id: u64,
    token: CancellationToken,
    moves: Arc<AtomicU32>,
    started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Session {
    status: DemoStatus,
    next_id: u64,
    run: Option<Run>,
    last_outcome: Option<DemoOutcome>,
}

/// Owner of the single demo run.
pub struct DemoOrchestrator {
    hub: Arc<Hub>,
    strategy: Mutex<Box<dyn Strategy>>,
    strategy_name: &'static str,
    max_moves: u32,
    /// Cadence in milliseconds, read at every wait.
    speed_ms: AtomicU64,
    session: Mutex<Session>,
}

impl core::fmt::Debug for DemoOrchestrator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DemoOrchestrator")
            .field("strategy", &self.strategy_name)
            .field("max_moves", &self.max_moves)
            .field("speed_ms", &self.speed_ms)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl DemoOrchestrator {
    /// Create an idle orchestrator that broadcasts through `hub`.
    pub fn new(
        hub: Arc<Hub>,
        strategy: Box<dyn Strategy>,
        max_moves: u32,
        default_speed: Duration,
    ) -> Self {
        let strategy_name = strategy.name();
        let default_ms = u64::try_from(default_speed.as_millis()).unwrap_or(u64::MAX);
        #[allow(clippy::cast_precision_loss)]
        let speed_ms = clamp_speed_ms(default_ms as f64 / 1000.0);
        Self {
            hub,
            strategy: Mutex::new(strategy),
            strategy_name,
            max_moves,
            speed_ms: AtomicU64::new(speed_ms),
            session: Mutex::new(Session {
                status: DemoStatus::Idle,
                next_id: 0,
                run: None,
                last_outcome: None,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current lifecycle status.
    pub fn status(&self) -> DemoStatus {
        self.session().status
    }

    /// Whether the step loop is live.
    pub fn is_running(&self) -> bool {
        self.status() == DemoStatus::Running
    }

    /// Attempts made in the current or most recent run.
    pub fn move_count(&self) -> u32 {
        self.session()
            .run
            .as_ref()
            .map_or(0, |run| run.moves.load(Ordering::Acquire))
    }

    /// When the current or most recent run started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.session().run.as_ref().map(|run| run.started_at)
    }

    /// How the most recent run ended, once it has.
    pub fn last_outcome(&self) -> Option<DemoOutcome> {
        self.session().last_outcome.clone()
    }

    /// Attempt cap per run.
    pub const fn max_moves(&self) -> u32 {
        self.max_moves
    }

    /// Name of the strategy driving the demo.
    pub const fn strategy_name(&self) -> &'static str {
        self.strategy_name
    }

    /// Current cadence between visualized steps.
    pub fn speed(&self) -> Duration {
        Duration::from_millis(self.speed_ms.load(Ordering::Acquire))
    }

    /// Current cadence in seconds.
    pub fn speed_secs(&self) -> f64 {
        self.speed().as_secs_f64()
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Set the cadence, clamped to `[0.1, 3.0]` seconds.
    ///
    /// Applies from the next wait onward, including the one the loop is
    /// about to enter. Returns the applied cadence.
    pub fn set_speed(&self, seconds: f64) -> Duration {
        let ms = clamp_speed_ms(seconds);
        let prev = self.speed_ms.swap(ms, Ordering::AcqRel);
        info!(previous_ms = prev, speed_ms = ms, "AI speed changed");
        Duration::from_millis(ms)
    }

    /// Start a run on `puzzle`.
    ///
    /// Broadcasts `demo_started` with the initial pegs and returns as soon
    /// as the step loop is spawned. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::AlreadyRunning`] without touching any state if
    /// a run is live.
    pub fn start(self: &Arc<Self>, puzzle: SharedPuzzle) -> Result<(), DemoError> {
        self.start_with(move || puzzle)
    }

    /// Start a run on the puzzle returned by `prepare`.
    ///
    /// `prepare` runs inside the same critical section as the running
    /// check, so it is only invoked by the start that wins. It must not
    /// call back into the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::AlreadyRunning`] without calling `prepare` if a
    /// run is live.
    pub fn start_with(
        self: &Arc<Self>,
        prepare: impl FnOnce() -> SharedPuzzle,
    ) -> Result<(), DemoError> {
        let moves = Arc::new(AtomicU32::new(0));
        let (run_id, token, puzzle) = {
            let mut session = self.session();
            if session.status == DemoStatus::Running {
                return Err(DemoError::AlreadyRunning);
            }
            let puzzle = prepare();
            let id = session.next_id;
            session.next_id = id.wrapping_add(1);
            let token = CancellationToken::new();
            session.status = DemoStatus::Running;
            session.run = Some(Run {
                id,
                token: token.clone(),
                moves: Arc::clone(&moves),
                started_at: Utc::now(),
            });
            (id, token, puzzle)
        };

        let initial_state = lock(&puzzle).snapshot();
        info!(
            run_id,
            disks = initial_state.disk_count(),
            max_moves = self.max_moves,
            speed_ms = self.speed_ms.load(Ordering::Acquire),
            strategy = self.strategy_name,
            "starting AI demo"
        );
        let _ = self.hub.broadcast(&ServerMessage::DemoStarted { initial_state });

        let this = Arc::clone(self);
        drop(tokio::spawn(this.supervise(run_id, token, moves, puzzle)));
        Ok(())
    }

    /// Request the running demo to stop.
    ///
    /// Flips the status to [`DemoStatus::Stopping`] and cancels the step
    /// loop. Broadcasts nothing. Returns whether a run was stopped.
    pub fn stop(&self) -> bool {
        let mut session = self.session();
        if session.status != DemoStatus::Running {
            return false;
        }
        session.status = DemoStatus::Stopping;
        if let Some(run) = session.run.as_ref() {
            run.token.cancel();
            info!(run_id = run.id, "AI demo stop requested");
        }
        true
    }

    // -----------------------------------------------------------------------
    // Step loop
    // -----------------------------------------------------------------------

    /// Run the step loop on its own task so a panic is caught as a fault,
    /// then finish the run.
    async fn supervise(
        self: Arc<Self>,
        run_id: u64,
        token: CancellationToken,
        moves: Arc<AtomicU32>,
        puzzle: SharedPuzzle,
    ) {
        let started = Instant::now();
        let worker = tokio::spawn(Arc::clone(&self).run_steps(token, Arc::clone(&moves), puzzle));
        let outcome = match worker.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => DemoOutcome::Faulted {
                message: String::from("step task panicked"),
            },
            Err(_) => DemoOutcome::Stopped,
        };
        self.finish(run_id, &outcome, started.elapsed());
    }

    async fn run_steps(
        self: Arc<Self>,
        token: CancellationToken,
        moves: Arc<AtomicU32>,
        puzzle: SharedPuzzle,
    ) -> DemoOutcome {
        loop {
            let attempted = moves.load(Ordering::Acquire);
            let mv = {
                // Held until the step is announced; see the apply block.
                let guard = lock(&puzzle);
                if token.is_cancelled() {
                    return DemoOutcome::Stopped;
                }
                if guard.is_solved() {
                    return DemoOutcome::Solved { moves: attempted };
                }
                if attempted >= self.max_moves {
                    return DemoOutcome::MoveCapReached { moves: attempted };
                }

                let encoded = guard.encode();
                let suggestion = match self.suggest(&encoded) {
                    Ok(s) => s,
                    Err(e) => {
                        return DemoOutcome::Faulted {
                            message: e.to_string(),
                        };
                    }
                };
                let mv = suggestion.mv;

                let _ = self.hub.broadcast(&ServerMessage::AiThinking {
                    data: ThinkingData {
                        game_state: guard.snapshot(),
                        predicted_move: suggestion.prediction(),
                        neural_activations: suggestion.activations,
                        move_number: attempted.saturating_add(1),
                        encoded_state: encoded,
                    },
                });
                mv
            };

            if !pause(&token, self.speed()).await {
                return DemoOutcome::Stopped;
            }

            {
                // A reset takes this lock after cancelling, so the move and
                // its announcement land either wholly before it or not at all.
                let mut guard = lock(&puzzle);
                if token.is_cancelled() {
                    return DemoOutcome::Stopped;
                }
                let new_state = guard.apply_move(mv.from, mv.to).then(|| guard.snapshot());
                let move_count = attempted.saturating_add(1);
                moves.store(move_count, Ordering::Release);

                let valid = new_state.is_some();
                if valid {
                    info!(move_count, from = mv.from, to = mv.to, "AI made move");
                } else {
                    warn!(move_count, from = mv.from, to = mv.to, "AI attempted invalid move");
                }
                let _ = self.hub.broadcast(&ServerMessage::AiMove {
                    data: MoveData {
                        from_tower: mv.from,
                        to_tower: mv.to,
                        new_state,
                        valid,
                        reason: (!valid).then(|| String::from(INVALID_MOVE_REASON)),
                        move_count,
                    },
                });
            }

            if !pause(&token, self.speed() / 2).await {
                return DemoOutcome::Stopped;
            }
        }
    }

    fn suggest(&self, encoded: &[f64]) -> Result<Suggestion, StrategyError> {
        let mut strategy = self.strategy.lock().unwrap_or_else(PoisonError::into_inner);
        strategy.suggest(encoded)
    }

    /// Return the session to idle and announce how the run ended.
    fn finish(&self, run_id: u64, outcome: &DemoOutcome, elapsed: Duration) {
        {
            let mut session = self.session();
            // A newer run may already own the session after a stop.
            if session.run.as_ref().is_some_and(|run| run.id == run_id) {
                session.status = DemoStatus::Idle;
                session.last_outcome = Some(outcome.clone());
            }
        }

        match outcome {
            DemoOutcome::Solved { moves } => {
                let total_time = elapsed.as_secs_f64();
                info!(run_id, moves, total_time, "AI solved puzzle");
                let _ = self.hub.broadcast(&ServerMessage::AiVictory {
                    data: VictoryData {
                        total_moves: *moves,
                        total_time,
                    },
                });
            }
            DemoOutcome::MoveCapReached { moves } => {
                info!(run_id, moves, max_moves = self.max_moves, "AI reached maximum moves");
                let _ = self.hub.broadcast(&ServerMessage::error(format!(
                    "AI reached maximum moves limit ({})",
                    self.max_moves
                )));
            }
            DemoOutcome::Stopped => {
                info!(run_id, "AI demo cancelled");
            }
            DemoOutcome::Faulted { message } => {
                error!(run_id, error = %message, "error in AI demo");
                let _ = self
                    .hub
                    .broadcast(&ServerMessage::error(format!("AI demo error: {message}")));
            }
        }
        info!(run_id, outcome = outcome.as_str(), "AI demo finished");
    }
}

/// Wait for `duration` unless `token` is cancelled first.
///
/// Returns `false` if the run was cancelled during or right at the end of
/// the wait.
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => !token.is_cancelled(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use hanoi_types::{Move, PEG_COUNT};
    use serde_json::Value;
    use tokio::sync::mpsc;

    use super::*;
    use crate::game::GameService;
    use crate::hub::{Connection, Frame};
    use crate::strategy::SolverStrategy;

    /// Plays a fixed list of moves, cycling.
    struct Scripted {
        moves: Vec<Move>,
        next: usize,
    }

    impl Scripted {
        fn new(moves: &[(usize, usize)]) -> Self {
            Self {
                moves: moves.iter().map(|&(f, t)| Move::new(f, t)).collect(),
                next: 0,
            }
        }
    }

    impl Strategy for Scripted {
        fn suggest(&mut self, _encoded: &[f64]) -> Result<Suggestion, StrategyError> {
            let mv = self.moves[self.next % self.moves.len()];
            self.next += 1;
            Ok(Suggestion::certain(mv))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct Failing;

    impl Strategy for Failing {
        fn suggest(&mut self, _encoded: &[f64]) -> Result<Suggestion, StrategyError> {
            Err(StrategyError::Internal(String::from("weights missing")))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct Panicking;

    impl Strategy for Panicking {
        fn suggest(&mut self, _encoded: &[f64]) -> Result<Suggestion, StrategyError> {
            panic!("boom");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn setup(
        strategy: Box<dyn Strategy>,
        max_moves: u32,
    ) -> (Arc<DemoOrchestrator>, mpsc::Receiver<Frame>, GameService) {
        let hub = Arc::new(Hub::new());
        let (conn, rx) = Connection::new(1024);
        hub.connect(conn);
        let demo = Arc::new(DemoOrchestrator::new(
            hub,
            strategy,
            max_moves,
            Duration::from_secs(1),
        ));
        (demo, rx, GameService::new(4))
    }

    async fn next_frame(rx: &mut mpsc::Receiver<Frame>) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(3600), rx.recv())
            .await
            .unwrap()
            .unwrap();
        serde_json::from_str(&frame).unwrap()
    }

    /// Collect frames until one of type `error` or `ai_victory` arrives.
    async fn until_terminal(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
        let mut frames = Vec::new();
        loop {
            let frame = next_frame(rx).await;
            let done = frame["type"] == "error" || frame["type"] == "ai_victory";
            frames.push(frame);
            if done {
                return frames;
            }
        }
    }

    async fn wait_for_status(demo: &DemoOrchestrator, wanted: DemoStatus) {
        for _ in 0..1000 {
            if demo.status() == wanted {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("status never became {wanted:?}, still {:?}", demo.status());
    }

    fn of_type<'a>(frames: &'a [Value], kind: &str) -> Vec<&'a Value> {
        frames.iter().filter(|f| f["type"] == kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn alternating_moves_hit_the_cap() {
        let strategy = Scripted::new(&[(0, 1), (1, 1), (1, 2), (2, 2)]);
        let (demo, mut rx, games) = setup(Box::new(strategy), 4);
        let puzzle = games.create_new_game();

        demo.start(puzzle).unwrap();
        let frames = until_terminal(&mut rx).await;

        assert_eq!(frames[0]["type"], "demo_started");
        let moves = of_type(&frames, "ai_move");
        assert_eq!(moves.len(), 4);
        let valid = moves.iter().filter(|m| m["data"]["valid"] == true).count();
        assert_eq!(valid, 2);
        assert_eq!(moves[3]["data"]["move_count"], 4);
        assert!(moves[1]["data"].get("new_state").is_none());
        assert_eq!(moves[1]["data"]["reason"], INVALID_MOVE_REASON);

        let last = frames.last().unwrap();
        assert_eq!(last["type"], "error");
        assert!(last["data"]["message"].as_str().unwrap().contains("(4)"));

        assert_eq!(demo.move_count(), 4);
        assert_eq!(demo.status(), DemoStatus::Idle);
        assert_eq!(
            demo.last_outcome(),
            Some(DemoOutcome::MoveCapReached { moves: 4 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn thinking_precedes_each_move() {
        let strategy = Scripted::new(&[(0, 1), (0, 2)]);
        let (demo, mut rx, games) = setup(Box::new(strategy), 2);
        demo.start(games.create_new_game()).unwrap();
        let frames = until_terminal(&mut rx).await;

        let kinds: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            ["demo_started", "ai_thinking", "ai_move", "ai_thinking", "ai_move", "error"]
        );
        assert_eq!(frames[1]["data"]["move_number"], 1);
        assert_eq!(frames[3]["data"]["move_number"], 2);
        assert_eq!(frames[1]["data"]["game_state"], serde_json::json!([[4, 3, 2, 1], [], []]));
        assert_eq!(
            frames[1]["data"]["encoded_state"].as_array().map(Vec::len),
            Some(4 * PEG_COUNT)
        );
        assert_eq!(frames[1]["data"]["predicted_move"]["from_tower"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn solver_wins_and_reports_totals() {
        let (demo, mut rx, _) = setup(Box::new(SolverStrategy::new()), 50);
        let games = GameService::new(3);
        demo.start(games.create_new_game()).unwrap();
        let frames = until_terminal(&mut rx).await;

        let last = frames.last().unwrap();
        assert_eq!(last["type"], "ai_victory");
        assert_eq!(last["data"]["total_moves"], 7);
        // 7 steps of 1s + 0.5s each
        let total_time = last["data"]["total_time"].as_f64().unwrap();
        assert!(total_time >= 10.5, "total_time {total_time}");
        assert_eq!(of_type(&frames, "ai_move").len(), 7);
        assert!(games.game_stats().unwrap().is_solved);
        assert_eq!(demo.status(), DemoStatus::Idle);
        assert_eq!(demo.last_outcome(), Some(DemoOutcome::Solved { moves: 7 }));
    }

    #[tokio::test(start_paused = true)]
    async fn solved_run_returns_to_idle() {
        let (demo, _rx, _) = setup(Box::new(SolverStrategy::new()), 50);
        let games = GameService::new(2);
        demo.start(games.create_new_game()).unwrap();
        assert_eq!(demo.status(), DemoStatus::Running);
        assert_eq!(demo.last_outcome(), None);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(demo.status(), DemoStatus::Idle);
        assert_eq!(demo.last_outcome(), Some(DemoOutcome::Solved { moves: 3 }));
        demo.start(games.create_new_game()).unwrap();
        assert!(demo.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn losing_start_never_prepares_a_puzzle() {
        let (demo, _rx, games) = setup(Box::new(SolverStrategy::new()), 50);
        demo.start_with(|| games.create_new_game()).unwrap();
        let running = games.current_game().unwrap();

        let mut prepared = false;
        let result = demo.start_with(|| {
            prepared = true;
            games.create_new_game()
        });
        assert_eq!(result, Err(DemoError::AlreadyRunning));
        assert!(!prepared);
        assert!(Arc::ptr_eq(&running, &games.current_game().unwrap()));
        demo.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected_without_side_effects() {
        let (demo, mut rx, games) = setup(Box::new(SolverStrategy::new()), 50);
        let puzzle = games.create_new_game();
        demo.start(Arc::clone(&puzzle)).unwrap();

        let other = games.create_new_game();
        assert_eq!(demo.start(other), Err(DemoError::AlreadyRunning));
        assert_eq!(demo.move_count(), 0);
        assert_eq!(lock(&puzzle).snapshot(), crate::puzzle::Puzzle::new(4).snapshot());

        // Only the first start announced itself.
        assert_eq!(next_frame(&mut rx).await["type"], "demo_started");
        assert_eq!(next_frame(&mut rx).await["type"], "ai_thinking");
        demo.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_wait_prevents_the_move() {
        let (demo, mut rx, games) = setup(Box::new(SolverStrategy::new()), 50);
        let puzzle = games.create_new_game();
        demo.start(Arc::clone(&puzzle)).unwrap();

        assert_eq!(next_frame(&mut rx).await["type"], "demo_started");
        assert_eq!(next_frame(&mut rx).await["type"], "ai_thinking");
        assert!(demo.stop());
        assert_eq!(demo.status(), DemoStatus::Stopping);
        assert!(!demo.stop());

        wait_for_status(&demo, DemoStatus::Idle).await;
        assert_eq!(demo.move_count(), 0);
        assert_eq!(lock(&puzzle).move_count(), 0);
        assert!(rx.try_recv().is_err(), "nothing is announced after a stop");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop() {
        let (demo, mut rx, games) = setup(Box::new(SolverStrategy::new()), 50);
        demo.start(games.create_new_game()).unwrap();
        assert_eq!(next_frame(&mut rx).await["type"], "demo_started");
        demo.stop();

        // Allowed even before the old loop has unwound.
        demo.start(games.create_new_game()).unwrap();
        assert!(demo.is_running());
        wait_for_status(&demo, DemoStatus::Idle).await;
        assert!(demo.started_at().is_some());
        // The cancelled first run does not overwrite the second's outcome.
        assert_eq!(demo.last_outcome(), Some(DemoOutcome::Solved { moves: 15 }));
    }

    #[tokio::test(start_paused = true)]
    async fn strategy_error_is_a_fault() {
        let (demo, mut rx, games) = setup(Box::new(Failing), 50);
        demo.start(games.create_new_game()).unwrap();
        let frames = until_terminal(&mut rx).await;
        let last = frames.last().unwrap();
        assert_eq!(last["type"], "error");
        assert!(last["data"]["message"]
            .as_str()
            .unwrap()
            .contains("weights missing"));
        assert_eq!(demo.status(), DemoStatus::Idle);

        // The session is usable again.
        demo.start(games.create_new_game()).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn panic_in_step_is_contained() {
        let (demo, mut rx, games) = setup(Box::new(Panicking), 50);
        demo.start(games.create_new_game()).unwrap();
        let frames = until_terminal(&mut rx).await;
        assert_eq!(frames.last().unwrap()["type"], "error");
        wait_for_status(&demo, DemoStatus::Idle).await;
        assert!(matches!(
            demo.last_outcome(),
            Some(DemoOutcome::Faulted { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn speed_changes_apply_to_the_next_wait() {
        let strategy = Scripted::new(&[(0, 1), (1, 0)]);
        let (demo, mut rx, games) = setup(Box::new(strategy), 1);
        assert_eq!(demo.speed(), Duration::from_secs(1));

        demo.start(games.create_new_game()).unwrap();
        let started = Instant::now();
        assert_eq!(next_frame(&mut rx).await["type"], "demo_started");
        let _ = demo.set_speed(3.0);
        let frames = until_terminal(&mut rx).await;
        assert_eq!(of_type(&frames, "ai_move").len(), 1);
        // thinking wait (3s) + post-move wait (1.5s)
        assert!(started.elapsed() >= Duration::from_millis(4500));
    }

    #[test]
    fn set_speed_clamps() {
        let demo = DemoOrchestrator::new(
            Arc::new(Hub::new()),
            Box::new(SolverStrategy::new()),
            50,
            Duration::from_secs(1),
        );
        assert_eq!(demo.set_speed(5.0), Duration::from_secs(3));
        assert_eq!(demo.speed_secs(), 3.0);
        assert_eq!(demo.set_speed(-1.0), Duration::from_millis(100));
        assert_eq!(demo.speed_secs(), 0.1);
        assert_eq!(demo.status(), DemoStatus::Idle);
        assert!(!demo.stop());
        assert_eq!(demo.strategy_name(), "solver");
        assert_eq!(demo.max_moves(), 50);
    }
}
