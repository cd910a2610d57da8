//! Lag prediction estimate: sub-predictor `d` guesses the sample seen `d`
//! steps earlier.

use super::Estimate;
use super::predictor::Scoreboard;
use crate::sample::SampleSequence;

/// Number of lags, `1..=MAX_LAG`.
pub const MAX_LAG: usize = 128;

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let symbols = seq.symbols();
    let mut board = Scoreboard::new(MAX_LAG);
    let mut guesses = [None; MAX_LAG];
    for i in 1..symbols.len() {
        for (d, guess) in guesses.iter_mut().enumerate() {
            let lag = d + 1;
            *guess = (lag <= i).then(|| symbols[i - lag]);
        }
        board.step(&guesses, symbols[i]);
    }
    board.into_estimate(seq.bits_per_sample())
}
