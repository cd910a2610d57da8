//! Most Common Value estimate.

use super::Estimate;
use crate::numeric::{min_entropy, upper_bound};
use crate::sample::SampleSequence;

/// `H = −log2 p_u` with `p̂` the relative frequency of the mode.
pub fn estimate(seq: &SampleSequence) -> Estimate {
    let n = seq.len();
    let p_hat = seq.mode_count() as f64 / n as f64;
    let p_u = upper_bound(p_hat, n);
    Estimate::new(min_entropy(p_u))
        .with("p_hat", p_hat)
        .with("p_upper", p_u)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biased_binary() {
        // 3/4 ones.
        let symbols: Vec<u8> = (0..100_000).map(|i| (i % 4 != 0) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let e = estimate(&seq);
        assert!((e.details["p_hat"] - 0.75).abs() < 1e-12);
        let expected = -(0.75 + 2.576 * (0.75f64 * 0.25 / 99_999.0).sqrt()).log2();
        assert!((e.min_entropy - expected).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_bytes_near_eight_bits() {
        let symbols: Vec<u8> = (0..1_000_000u32).map(|i| (i % 256) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 8).unwrap();
        let e = estimate(&seq);
        assert!(e.min_entropy > 7.8 && e.min_entropy < 8.0, "{}", e.min_entropy);
    }
}
