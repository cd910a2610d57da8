//! Multi Markov-Model-with-Counting prediction estimate.
//!
//! Sub-predictor `d` is an order-`d` Markov model: it counts which value
//! followed each `d`-sample context and predicts the most frequent follower.

use std::collections::HashMap;

use super::Estimate;
use super::predictor::Scoreboard;
use crate::sample::SampleSequence;

/// Highest model order.
pub const MAX_ORDER: usize = 16;

/// New contexts stop being added to a model once it holds this many.
pub const MAX_ENTRIES: usize = 100_000;

/// Follower counts of one context, with the current favourite cached.
/// Ties favour the larger value.
#[derive(Debug, Clone, Default)]
pub(crate) struct Followers {
    counts: Vec<(u8, u32)>,
    best: Option<(u8, u32)>,
}

impl Followers {
    pub(crate) fn increment(&mut self, value: u8) {
        let count = match self.counts.binary_search_by_key(&value, |&(v, _)| v) {
            Ok(pos) => {
                self.counts[pos].1 += 1;
                self.counts[pos].1
            }
            Err(pos) => {
                self.counts.insert(pos, (value, 1));
                1
            }
        };
        let better = match self.best {
            None => true,
            Some((v, c)) => count > c || (count == c && value > v),
        };
        if better {
            self.best = Some((value, count));
        }
    }

    pub(crate) fn best(&self) -> Option<(u8, u32)> {
        self.best
    }
}

/// Pack up to 16 samples of at most 8 bits into one key.
pub(crate) fn context_key(context: &[u8]) -> u128 {
    context.iter().fold(0u128, |acc, &s| (acc << 8) | s as u128)
}

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let symbols = seq.symbols();
    let mut models: Vec<HashMap<u128, Followers>> = vec![HashMap::new(); MAX_ORDER];
    let mut board = Scoreboard::new(MAX_ORDER);
    let mut guesses = [None; MAX_ORDER];

    for i in 2..symbols.len() {
        let prev = symbols[i - 1];
        for (d, model) in (1..=MAX_ORDER).zip(models.iter_mut()) {
            if d + 1 > i {
                break;
            }
            let key = context_key(&symbols[i - d - 1..i - 1]);
            if let Some(followers) = model.get_mut(&key) {
                followers.increment(prev);
            } else if model.len() < MAX_ENTRIES {
                model.entry(key).or_default().increment(prev);
            }
        }

        for (d, (guess, model)) in (1..=MAX_ORDER).zip(guesses.iter_mut().zip(&models)) {
            *guess = if d <= i {
                model
                    .get(&context_key(&symbols[i - d..i]))
                    .and_then(Followers::best)
                    .map(|(v, _)| v)
            } else {
                None
            };
        }
        board.step(&guesses, symbols[i]);
    }
    board.into_estimate(seq.bits_per_sample())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_followers_tie_prefers_larger_value() {
        let mut f = Followers::default();
        f.increment(2);
        f.increment(7);
        assert_eq!(f.best(), Some((7, 1)));
        f.increment(2);
        assert_eq!(f.best(), Some((2, 2)));
        f.increment(7);
        assert_eq!(f.best(), Some((7, 2)));
    }

    #[test]
    fn test_order_two_pattern_learned() {
        // x[i] = x[i-1] XOR x[i-2]: fully determined by the previous two bits.
        let mut symbols = vec![0u8, 1];
        for i in 2..30_000 {
            symbols.push(symbols[i - 1] ^ symbols[i - 2]);
        }
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let e = estimate(&seq);
        assert_eq!(e.details["predictions"], (30_000 - 2) as f64);
        assert!(e.min_entropy < 0.05, "{}", e.min_entropy);
    }
}
