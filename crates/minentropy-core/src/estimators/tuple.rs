//! t-Tuple estimate.

use super::Estimate;
use crate::numeric::{min_entropy, upper_bound};
use crate::sample::SampleSequence;
use crate::suffix::RepeatProfile;

/// A tuple length qualifies while its most common tuple occurs this often.
pub const MIN_OCCURRENCES: u64 = 35;

/// Largest `t` whose most common `t`-tuple occurs at least
/// [`MIN_OCCURRENCES`] times; 0 if not even single symbols do.
pub fn cutoff_length(profile: &RepeatProfile) -> usize {
    let mut t = 0;
    while profile.max_tuple_count(t + 1) >= MIN_OCCURRENCES {
        t += 1;
    }
    t
}

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let profile = RepeatProfile::new(seq.symbols());
    estimate_with_profile(seq.len(), &profile)
}

pub fn estimate_with_profile(len: usize, profile: &RepeatProfile) -> Estimate {
    let t = cutoff_length(profile);
    if t == 0 {
        return Estimate::new(0.0).with("t", 0.0);
    }
    let p_hat = (1..=t)
        .map(|i| {
            let q = profile.max_tuple_count(i) as f64 / (len - i + 1) as f64;
            q.powf(1.0 / i as f64)
        })
        .fold(0.0, f64::max);
    let p_u = upper_bound(p_hat, len);
    Estimate::new(min_entropy(p_u))
        .with("t", t as f64)
        .with("p_hat", p_hat)
        .with("p_upper", p_u)
}
