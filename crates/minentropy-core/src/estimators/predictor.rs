//! Shared machinery of the predictor estimators.
//!
//! An ensemble predictor runs several sub-predictors side by side and, at
//! every step, trusts the one with the best running score. The ensemble's
//! hit/miss record feeds the global and local predictability bounds.

use super::Estimate;
use crate::numeric::PredictorBounds;

/// Running hit/miss record of a single predictor.
#[derive(Debug, Clone, Default)]
pub struct Outcomes {
    predictions: usize,
    correct: usize,
    run: usize,
    longest_run: usize,
}

impl Outcomes {
    pub fn record(&mut self, hit: bool) {
        self.predictions += 1;
        if hit {
            self.correct += 1;
            self.run += 1;
            self.longest_run = self.longest_run.max(self.run);
        } else {
            self.run = 0;
        }
    }

    pub fn bounds(&self) -> PredictorBounds {
        PredictorBounds::new(self.predictions, self.correct, self.longest_run)
    }

    /// Entropy estimate with the bound intermediates attached.
    pub fn into_estimate(self, bits_per_sample: u8) -> Estimate {
        let bounds = self.bounds();
        Estimate::new(bounds.min_entropy(bits_per_sample))
            .with("predictions", bounds.predictions as f64)
            .with("correct", bounds.correct as f64)
            .with("longest_run", bounds.longest_run as f64)
            .with("p_global", bounds.p_global)
            .with("p_local", bounds.p_local)
    }
}

/// Scoreboard over `n` sub-predictors; the winner starts at index 0.
#[derive(Debug, Clone)]
pub struct Scoreboard {
    scores: Vec<u64>,
    winner: usize,
    outcomes: Outcomes,
}

impl Scoreboard {
    pub fn new(predictors: usize) -> Self {
        Self {
            scores: vec![0; predictors],
            winner: 0,
            outcomes: Outcomes::default(),
        }
    }

    pub fn winner(&self) -> usize {
        self.winner
    }

    /// Score one step: the winner's guess counts for the ensemble, then every
    /// sub-predictor that guessed right gains a point. Equal scores hand the
    /// lead to the later predictor.
    pub fn step(&mut self, predictions: &[Option<u8>], actual: u8) {
        self.outcomes
            .record(predictions[self.winner] == Some(actual));
        for (j, &guess) in predictions.iter().enumerate() {
            if guess == Some(actual) {
                self.scores[j] += 1;
                if self.scores[j] >= self.scores[self.winner] {
                    self.winner = j;
                }
            }
        }
    }

    pub fn into_estimate(self, bits_per_sample: u8) -> Estimate {
        self.outcomes.into_estimate(bits_per_sample)
    }
}
