//! Seeded random-weight policy network.
//!
//! [`NetworkStrategy`] is a small feed-forward network (`3N -> 16 -> 8 -> 6`)
//! whose weights are drawn from a seeded RNG. It is untrained: it exists so
//! the dashboard has realistic activations to draw and so the demo shows
//! illegal attempts being penalized. The six outputs are two softmax heads,
//! one over source pegs and one over destination pegs.

use hanoi_types::{ActivationMap, Move, PEG_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::strategy::{Strategy, StrategyError, Suggestion};

/// Widths of the hidden layers.
const HIDDEN_WIDTHS: [usize; 2] = [16, 8];

/// One fully connected layer.
#[derive(Debug, Clone)]
struct Dense {
    /// Row-major weights, one row per output unit.
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl Dense {
    fn random(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.random_range(-1.0_f64..1.0)).collect())
            .collect();
        let bias = (0..outputs).map(|_| rng.random_range(-0.1_f64..0.1)).collect();
        Self { weights, bias }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

fn relu(values: Vec<f64>) -> Vec<f64> {
    values.into_iter().map(|v| v.max(0.0)).collect()
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|v| (v - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index and value of the largest probability.
fn argmax(probabilities: &[f64]) -> Option<(usize, f64)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Untrained policy network with reproducible weights.
#[derive(Debug, Clone)]
pub struct NetworkStrategy {
    input_len: usize,
    layers: Vec<Dense>,
}

impl NetworkStrategy {
    /// Build a network for puzzles of `n_disks` disks, seeding the weights
    /// with `seed`.
    pub fn new(n_disks: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let input_len = usize::try_from(n_disks)
            .unwrap_or(0)
            .saturating_mul(PEG_COUNT);

        let mut layers = Vec::with_capacity(HIDDEN_WIDTHS.len().saturating_add(1));
        let mut width = input_len;
        for &hidden in &HIDDEN_WIDTHS {
            layers.push(Dense::random(width, hidden, &mut rng));
            width = hidden;
        }
        layers.push(Dense::random(width, PEG_COUNT.saturating_mul(2), &mut rng));

        Self { input_len, layers }
    }
}

impl Strategy for NetworkStrategy {
    fn suggest(&mut self, encoded: &[f64]) -> Result<Suggestion, StrategyError> {
        if encoded.len() != self.input_len {
            return Err(StrategyError::InvalidState(format!(
                "expected {} inputs, got {}",
                self.input_len,
                encoded.len()
            )));
        }

        let mut activations = ActivationMap::new();
        activations.insert(String::from("input"), encoded.to_vec());

        let last = self.layers.len().saturating_sub(1);
        let mut current = encoded.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            let out = layer.forward(&current);
            current = if i == last { out } else { relu(out) };
            let name = if i == last {
                String::from("output")
            } else {
                format!("hidden_{}", i.saturating_add(1))
            };
            activations.insert(name, current.clone());
        }

        let (from_logits, to_logits) = current.split_at(PEG_COUNT.min(current.len()));
        let from_probabilities = softmax(from_logits);
        let to_probabilities = softmax(to_logits);

        let (from, p_from) = argmax(&from_probabilities)
            .ok_or_else(|| StrategyError::Internal(String::from("empty source head")))?;
        let (to, p_to) = argmax(&to_probabilities)
            .ok_or_else(|| StrategyError::Internal(String::from("empty destination head")))?;

        Ok(Suggestion {
            mv: Move::new(from, to),
            confidence: p_from * p_to,
            from_probabilities,
            to_probabilities,
            activations,
        })
    }

    fn name(&self) -> &'static str {
        "network"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::puzzle::Puzzle;

    #[test]
    fn same_seed_gives_same_suggestion() {
        let encoded = Puzzle::new(4).encode();
        let mut a = NetworkStrategy::new(4, 7);
        let mut b = NetworkStrategy::new(4, 7);
        assert_eq!(a.suggest(&encoded).unwrap(), b.suggest(&encoded).unwrap());
    }

    #[test]
    fn heads_are_probability_distributions() {
        let mut net = NetworkStrategy::new(4, 42);
        let s = net.suggest(&Puzzle::new(4).encode()).unwrap();
        for head in [&s.from_probabilities, &s.to_probabilities] {
            assert_eq!(head.len(), PEG_COUNT);
            let total: f64 = head.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
        assert!(s.mv.from < PEG_COUNT && s.mv.to < PEG_COUNT);
        assert!(s.confidence > 0.0 && s.confidence <= 1.0);
    }

    #[test]
    fn reports_every_layer() {
        let mut net = NetworkStrategy::new(3, 1);
        let s = net.suggest(&Puzzle::new(3).encode()).unwrap();
        assert_eq!(s.activations.get("input").map(Vec::len), Some(9));
        assert_eq!(s.activations.get("hidden_1").map(Vec::len), Some(16));
        assert_eq!(s.activations.get("hidden_2").map(Vec::len), Some(8));
        assert_eq!(s.activations.get("output").map(Vec::len), Some(6));
        assert!(s.activations["hidden_1"].iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn wrong_input_length_is_an_error() {
        let mut net = NetworkStrategy::new(4, 42);
        let result = net.suggest(&Puzzle::new(3).encode());
        assert!(matches!(result, Err(StrategyError::InvalidState(_))));
    }
}
