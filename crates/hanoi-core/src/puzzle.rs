//! The peg/disk puzzle state machine.
//!
//! [`Puzzle`] holds three pegs of strictly decreasing disk sizes. All
//! mutation goes through [`Puzzle::apply_move`], which fails closed: an
//! illegal move leaves the puzzle untouched. There is no I/O and no
//! interior mutability here; sharing is the caller's concern.

use hanoi_types::{PegIndex, PuzzleSnapshot, PEG_COUNT};

/// Number of disks used when none is configured.
pub const DEFAULT_DISKS: u32 = 4;

/// A Tower of Hanoi puzzle with a fixed number of disks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    /// Peg contents, bottom-to-top.
    pegs: [Vec<u32>; PEG_COUNT],
    /// Disk count, fixed at construction.
    n_disks: u32,
    /// Successful moves since the last reset.
    moves: u32,
}

impl Puzzle {
    /// Create a puzzle with all `n_disks` disks stacked on peg 0.
    pub fn new(n_disks: u32) -> Self {
        Self {
            pegs: Self::stacked(n_disks),
            n_disks,
            moves: 0,
        }
    }

    fn stacked(n_disks: u32) -> [Vec<u32>; PEG_COUNT] {
        [(1..=n_disks).rev().collect(), Vec::new(), Vec::new()]
    }

    /// Number of disks in play.
    pub const fn n_disks(&self) -> u32 {
        self.n_disks
    }

    /// Successful moves applied since construction or the last reset.
    pub const fn move_count(&self) -> u32 {
        self.moves
    }

    /// Top disk of `peg`, if the peg exists and is non-empty.
    pub fn top(&self, peg: PegIndex) -> Option<u32> {
        self.pegs.get(peg).and_then(|p| p.last().copied())
    }

    /// Whether moving the top disk of `from` onto `to` is legal.
    pub fn is_legal(&self, from: PegIndex, to: PegIndex) -> bool {
        if from == to || from >= PEG_COUNT || to >= PEG_COUNT {
            return false;
        }
        let Some(disk) = self.top(from) else {
            return false;
        };
        self.top(to).is_none_or(|top| top > disk)
    }

    /// Move the top disk of `from` onto `to`.
    ///
    /// Returns `false` without mutating anything if the move is illegal:
    /// same peg, index out of range, empty source, or a smaller disk on
    /// the destination.
    pub fn apply_move(&mut self, from: PegIndex, to: PegIndex) -> bool {
        if !self.is_legal(from, to) {
            return false;
        }
        let Some(disk) = self.pegs.get_mut(from).and_then(Vec::pop) else {
            return false;
        };
        if let Some(dest) = self.pegs.get_mut(to) {
            dest.push(disk);
        }
        self.moves = self.moves.saturating_add(1);
        true
    }

    /// Solved when peg 0 is empty and exactly one of pegs 1 and 2 holds
    /// every disk.
    pub fn is_solved(&self) -> bool {
        let [first, second, third] = &self.pegs;
        let n = usize::try_from(self.n_disks).unwrap_or(usize::MAX);
        first.is_empty() && ((second.len() == n) != (third.len() == n))
    }

    /// Immutable wire view of the pegs.
    pub fn snapshot(&self) -> PuzzleSnapshot {
        PuzzleSnapshot(self.pegs.clone())
    }

    /// Restore the initial stacked state. The disk count is unchanged.
    pub fn reset(&mut self) {
        self.pegs = Self::stacked(self.n_disks);
        self.moves = 0;
    }

    /// One-hot encoding of disk positions.
    ///
    /// For each disk size `1..=N`, in that order, three entries mark which
    /// peg holds it. The result has length `3 * N`.
    pub fn encode(&self) -> Vec<f64> {
        let n = usize::try_from(self.n_disks).unwrap_or(0);
        let mut encoded = vec![0.0; n.saturating_mul(PEG_COUNT)];
        for (peg, disks) in self.pegs.iter().enumerate() {
            for &disk in disks {
                let Ok(size) = usize::try_from(disk) else {
                    continue;
                };
                let slot = size
                    .saturating_sub(1)
                    .saturating_mul(PEG_COUNT)
                    .saturating_add(peg);
                if let Some(cell) = encoded.get_mut(slot) {
                    *cell = 1.0;
                }
            }
        }
        encoded
    }
}

impl Default for Puzzle {
    fn default() -> Self {
        Self::new(DEFAULT_DISKS)
    }
}
