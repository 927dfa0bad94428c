//! Strategy trait and the optimal solver implementation.
//!
//! During each demo step the orchestrator encodes the puzzle with
//! [`Puzzle::encode`](crate::puzzle::Puzzle::encode) and asks a
//! [`Strategy`] for the next move. The trait abstracts how the suggestion
//! is produced -- a policy network, a scripted solver, or a test stub.
//! Suggestions are not trusted: the orchestrator applies them through the
//! legality-checked puzzle and counts rejected ones as penalized steps.

use hanoi_types::{ActivationMap, Move, MovePrediction, PegIndex, PEG_COUNT};

/// Peg the solver moves the tower onto.
pub const TARGET_PEG: PegIndex = 2;

/// Errors a strategy can raise while computing a suggestion.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// The encoded state is not a valid one-hot position vector.
    #[error("invalid encoded state: {0}")]
    InvalidState(String),

    /// The strategy has nothing to suggest (e.g. the puzzle is solved).
    #[error("no move available")]
    NoMove,

    /// An internal error in the strategy.
    #[error("strategy error: {0}")]
    Internal(String),
}

/// A suggested move plus the diagnostics shown in the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// The move to attempt.
    pub mv: Move,
    /// Joint confidence in `[0, 1]`.
    pub confidence: f64,
    /// Probability of each peg being the source.
    pub from_probabilities: Vec<f64>,
    /// Probability of each peg being the destination.
    pub to_probabilities: Vec<f64>,
    /// Per-layer activations.
    pub activations: ActivationMap,
}

impl Suggestion {
    /// A fully confident suggestion with one-hot probabilities and no
    /// activations beyond what the caller adds.
    pub fn certain(mv: Move) -> Self {
        Self {
            mv,
            confidence: 1.0,
            from_probabilities: one_hot(mv.from),
            to_probabilities: one_hot(mv.to),
            activations: ActivationMap::new(),
        }
    }

    /// Wire form of the suggested move.
    pub fn prediction(&self) -> MovePrediction {
        MovePrediction {
            from_tower: self.mv.from,
            to_tower: self.mv.to,
            confidence: self.confidence,
            from_probabilities: self.from_probabilities.clone(),
            to_probabilities: self.to_probabilities.clone(),
        }
    }
}

fn one_hot(peg: PegIndex) -> Vec<f64> {
    (0..PEG_COUNT)
        .map(|i| if i == peg { 1.0 } else { 0.0 })
        .collect()
}

/// A source of move suggestions.
///
/// Implementations map an encoded puzzle state (see
/// [`Puzzle::encode`](crate::puzzle::Puzzle::encode)) to the next move.
/// They must not block for long: the call happens inline in the demo
/// step loop.
pub trait Strategy: Send {
    /// Suggest the next move for `encoded`.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if no suggestion can be produced. The
    /// demo loop treats this as a fault and ends the run.
    fn suggest(&mut self, encoded: &[f64]) -> Result<Suggestion, StrategyError>;

    /// Short name for logs and the info endpoint.
    fn name(&self) -> &'static str;
}

/// Decode a one-hot state vector into the peg holding each disk.
///
/// Element `i` of the result is the peg of the disk of size `i + 1`.
///
/// # Errors
///
/// Returns [`StrategyError::InvalidState`] if the length is not a
/// multiple of three or a disk's triple is not exactly one-hot.
pub fn decode_positions(encoded: &[f64]) -> Result<Vec<PegIndex>, StrategyError> {
    if encoded.len() % PEG_COUNT != 0 {
        return Err(StrategyError::InvalidState(format!(
            "length {} is not a multiple of {PEG_COUNT}",
            encoded.len()
        )));
    }
    encoded
        .chunks(PEG_COUNT)
        .enumerate()
        .map(|(i, triple)| {
            let mut marked = triple
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v > 0.5)
                .map(|(peg, _)| peg);
            match (marked.next(), marked.next()) {
                (Some(peg), None) => Ok(peg),
                _ => Err(StrategyError::InvalidState(format!(
                    "disk {} is not on exactly one peg",
                    i.saturating_add(1)
                ))),
            }
        })
        .collect()
}

/// First move of the optimal plan that puts disks `1..=k` on `target`.
///
/// `positions[i]` is the peg of disk `i + 1`. Returns `None` when those
/// disks are already in place.
fn next_optimal_move(positions: &[PegIndex], k: usize, target: PegIndex) -> Option<Move> {
    let largest = k.checked_sub(1)?;
    let &at = positions.get(largest)?;
    if at == target {
        return next_optimal_move(positions, largest, target);
    }
    // Everything smaller must clear out to the spare peg first.
    let spare = (0..PEG_COUNT).find(|&p| p != at && p != target)?;
    next_optimal_move(positions, largest, spare).or(Some(Move::new(at, target)))
}

/// Strategy that always plays the optimal move toward [`TARGET_PEG`].
///
/// Works from any legal position, not just the initial stack, so it
/// recovers after a reset mid-run.
#[derive(Debug, Clone, Default)]
pub struct SolverStrategy;

impl SolverStrategy {
    /// Create a new solver strategy.
    pub const fn new() -> Self {
        Self
    }
}

impl Strategy for SolverStrategy {
    fn suggest(&mut self, encoded: &[f64]) -> Result<Suggestion, StrategyError> {
        let positions = decode_positions(encoded)?;
        let mv = next_optimal_move(&positions, positions.len(), TARGET_PEG)
            .ok_or(StrategyError::NoMove)?;

        let mut suggestion = Suggestion::certain(mv);
        suggestion
            .activations
            .insert(String::from("input"), encoded.to_vec());
        let mut output = suggestion.from_probabilities.clone();
        output.extend_from_slice(&suggestion.to_probabilities);
        suggestion.activations.insert(String::from("output"), output);
        Ok(suggestion)
    }

    fn name(&self) -> &'static str {
        "solver"
    }
}
