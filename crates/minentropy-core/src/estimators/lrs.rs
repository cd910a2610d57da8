//! Longest Repeated Substring estimate.
//!
//! Picks up where t-Tuple stops: tuple lengths from `t + 1` up to the
//! longest repeated substring, using pair-collision rates instead of the
//! most common count.

use super::Estimate;
use super::tuple::cutoff_length;
use crate::numeric::{min_entropy, upper_bound};
use crate::sample::SampleSequence;
use crate::suffix::RepeatProfile;

fn pairs_in(n: usize) -> f64 {
    let n = n as f64;
    n * (n - 1.0) / 2.0
}

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let profile = RepeatProfile::new(seq.symbols());
    estimate_with_profile(seq.len(), seq.bits_per_sample(), &profile)
}

pub fn estimate_with_profile(len: usize, bits: u8, profile: &RepeatProfile) -> Estimate {
    let u = cutoff_length(profile) + 1;
    let v = profile.longest_repeat();
    if u > v {
        return Estimate::new(bits as f64)
            .with("u", u as f64)
            .with("v", v as f64);
    }
    let p_hat = (u..=v)
        .map(|w| {
            let p_w = profile.pair_count(w) as f64 / pairs_in(len - w + 1);
            p_w.powf(1.0 / w as f64)
        })
        .fold(0.0, f64::max);
    let p_u = upper_bound(p_hat, len);
    Estimate::new(min_entropy(p_u))
        .with("u", u as f64)
        .with("v", v as f64)
        .with("p_hat", p_hat)
        .with("p_upper", p_u)
}
