//! Peg snapshot and move types shared by the engine and the wire protocol.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Number of pegs in the puzzle. Fixed by the game rules.
pub const PEG_COUNT: usize = 3;

/// Index of a peg. Valid values are `0..PEG_COUNT`; anything else is an
/// illegal move target rather than a type error, because strategies are
/// allowed to suggest nonsense.
pub type PegIndex = usize;

/// Wire-ready view of all three pegs.
///
/// Serializes as an array of exactly three arrays of disk sizes, each
/// ordered bottom-to-top, e.g. `[[4,3,2,1],[],[]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PuzzleSnapshot(pub [Vec<u32>; PEG_COUNT]);

impl PuzzleSnapshot {
    /// Total number of disks across all pegs.
    pub fn disk_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }
}

/// A single attempted move from one peg to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Move {
    /// Source peg.
    pub from: PegIndex,
    /// Destination peg.
    pub to: PegIndex,
}

impl Move {
    /// Construct a move.
    pub const fn new(from: PegIndex, to: PegIndex) -> Self {
        Self { from, to }
    }
}

impl core::fmt::Display for Move {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
