//! LZ78Y prediction estimate.
//!
//! One dictionary holds contexts of every length `1..=MAX_CONTEXT`. Each step
//! the preceding contexts learn the value that followed them, then every
//! matching context votes; the single highest follower count wins, longer
//! contexts first on ties.

use std::collections::HashMap;

use super::Estimate;
use super::multi_mmc::{Followers, context_key};
use super::predictor::Outcomes;
use crate::sample::SampleSequence;

/// Longest context length.
pub const MAX_CONTEXT: usize = 16;

/// Dictionary capacity in contexts.
pub const MAX_DICTIONARY: usize = 65_536;

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let symbols = seq.symbols();
    let mut dictionary: HashMap<(usize, u128), Followers> = HashMap::new();
    let mut outcomes = Outcomes::default();

    for i in MAX_CONTEXT + 1..symbols.len() {
        let prev = symbols[i - 1];
        for j in (1..=MAX_CONTEXT).rev() {
            let key = (j, context_key(&symbols[i - j - 1..i - 1]));
            if let Some(followers) = dictionary.get_mut(&key) {
                followers.increment(prev);
            } else if dictionary.len() < MAX_DICTIONARY {
                dictionary.entry(key).or_default().increment(prev);
            }
        }

        let mut prediction = None;
        let mut max_count = 0u32;
        for j in (1..=MAX_CONTEXT).rev() {
            let key = (j, context_key(&symbols[i - j..i]));
            if let Some((value, count)) = dictionary.get(&key).and_then(Followers::best) {
                if count > max_count {
                    prediction = Some(value);
                    max_count = count;
                }
            }
        }
        outcomes.record(prediction == Some(symbols[i]));
    }
    outcomes.into_estimate(seq.bits_per_sample())
}
