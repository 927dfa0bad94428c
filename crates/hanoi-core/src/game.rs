//! Game lifecycle: owns the current puzzle.
//!
//! [`GameService`] creates, replaces, and resets the puzzle that clients
//! see and the demo drives. The puzzle itself is shared as a
//! [`SharedPuzzle`] so the demo loop can hold on to it for the length of a
//! run while the service stays free to hand out snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hanoi_types::PuzzleSnapshot;
use serde::Serialize;
use tracing::info;

use crate::puzzle::Puzzle;

/// A puzzle shared between the game service and a demo run.
///
/// The lock is never held across an await point, so every move is applied
/// atomically with respect to other tasks.
pub type SharedPuzzle = Arc<Mutex<Puzzle>>;

/// Lock a shared puzzle, recovering from poisoning.
pub fn lock(puzzle: &SharedPuzzle) -> MutexGuard<'_, Puzzle> {
    puzzle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Progress summary for the current game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameStats {
    /// Successful moves so far.
    pub moves: u32,
    /// Whether the puzzle is solved.
    pub is_solved: bool,
}

/// Owner of the current game.
#[derive(Debug)]
pub struct GameService {
    n_disks: u32,
    current: Mutex<Option<SharedPuzzle>>,
    running: AtomicBool,
}

impl GameService {
    /// Create a service that builds puzzles of `n_disks` disks.
    pub const fn new(n_disks: u32) -> Self {
        Self {
            n_disks,
            current: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<SharedPuzzle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Disk count used for new games.
    pub const fn n_disks(&self) -> u32 {
        self.n_disks
    }

    /// Replace the current game with a fresh one and return it.
    pub fn create_new_game(&self) -> SharedPuzzle {
        let puzzle = Arc::new(Mutex::new(Puzzle::new(self.n_disks)));
        *self.slot() = Some(Arc::clone(&puzzle));
        info!(n_disks = self.n_disks, "new game created");
        puzzle
    }

    /// The current game, if one has been created.
    pub fn current_game(&self) -> Option<SharedPuzzle> {
        self.slot().clone()
    }

    /// Reset the current game in place, or create one if none exists.
    /// Marks the game as not running.
    pub fn reset_game(&self) -> SharedPuzzle {
        let puzzle = {
            let mut slot = self.slot();
            if let Some(existing) = slot.as_ref() {
                lock(existing).reset();
                Arc::clone(existing)
            } else {
                let fresh = Arc::new(Mutex::new(Puzzle::new(self.n_disks)));
                *slot = Some(Arc::clone(&fresh));
                fresh
            }
        };
        self.running.store(false, Ordering::Release);
        info!("game reset");
        puzzle
    }

    /// Mark the game as running.
    pub fn start_game(&self) {
        self.running.store(true, Ordering::Release);
        info!("game started");
    }

    /// Mark the game as stopped.
    pub fn stop_game(&self) {
        self.running.store(false, Ordering::Release);
        info!("game stopped");
    }

    /// Whether a game is marked as running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot of the current game, or of a fresh puzzle when there is
    /// no game yet.
    pub fn snapshot(&self) -> PuzzleSnapshot {
        self.current_game().map_or_else(
            || Puzzle::new(self.n_disks).snapshot(),
            |puzzle| lock(&puzzle).snapshot(),
        )
    }

    /// Progress of the current game.
    pub fn game_stats(&self) -> Option<GameStats> {
        self.current_game().map(|puzzle| {
            let guard = lock(&puzzle);
            GameStats {
                moves: guard.move_count(),
                is_solved: guard.is_solved(),
            }
        })
    }
}
