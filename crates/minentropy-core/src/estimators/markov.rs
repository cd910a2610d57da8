//! Markov estimate.
//!
//! Fits a first-order chain over the observed alphabet, inflates every
//! initial and transition probability by its confidence margin, then finds
//! the most likely path of [`PATH_LEN`] samples. Products are kept in the
//! log2 domain so non-binary alphabets do not underflow.

use super::Estimate;
use crate::sample::SampleSequence;

/// Length of the most likely sample path.
pub const PATH_LEN: usize = 128;

pub fn estimate(seq: &SampleSequence) -> Estimate {
    let symbols = seq.symbols();
    let n = symbols.len();
    let alphabet = seq.alphabet();
    let k = alphabet.len();
    let bits = seq.bits_per_sample() as f64;

    let mut state = [0usize; 256];
    for (i, &a) in alphabet.iter().enumerate() {
        state[a as usize] = i;
    }

    let exponent = (k * k).max(PATH_LEN) as f64;
    let alpha = 0.99f64.powf(exponent);
    let log_term = (1.0 / (1.0 - alpha)).log2();
    let eps = (log_term / (2.0 * n as f64)).sqrt();

    let initial: Vec<f64> = alphabet
        .iter()
        .map(|&a| (seq.histogram()[a as usize] as f64 / n as f64 + eps).min(1.0))
        .collect();

    let mut from = vec![0u64; k];
    let mut pairs = vec![0u64; k * k];
    for w in symbols.windows(2) {
        let (i, j) = (state[w[0] as usize], state[w[1] as usize]);
        from[i] += 1;
        pairs[i * k + j] += 1;
    }

    // Row-major log2 transition matrix.
    let mut log_t = vec![0.0f64; k * k];
    for i in 0..k {
        let row = &mut log_t[i * k..(i + 1) * k];
        // A state never left (only the last sample) may go anywhere: p = 1.
        if from[i] == 0 {
            row.fill(0.0);
            continue;
        }
        let o_i = from[i] as f64;
        let eps_i = (log_term / (2.0 * o_i)).sqrt();
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (pairs[i * k + j] as f64 / o_i + eps_i).min(1.0).log2();
        }
    }

    let mut best: Vec<f64> = initial.iter().map(|p| p.log2()).collect();
    let mut next = vec![f64::NEG_INFINITY; k];
    for _ in 1..PATH_LEN {
        for (j, slot) in next.iter_mut().enumerate() {
            *slot = (0..k)
                .map(|i| best[i] + log_t[i * k + j])
                .fold(f64::NEG_INFINITY, f64::max);
        }
        std::mem::swap(&mut best, &mut next);
    }
    let log_p_max = best.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let h = (-log_p_max / PATH_LEN as f64).min(bits);

    Estimate::new(h)
        .with("log2_p_max", log_p_max)
        .with("states", k as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_alternating_is_predictable() {
        let symbols: Vec<u8> = (0..100_000).map(|i| (i % 2) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let e = estimate(&seq);
        assert!(e.min_entropy < 0.05, "{}", e.min_entropy);
    }

    #[test]
    fn test_random_bits_near_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let symbols: Vec<u8> = (0..500_000).map(|_| rng.random_range(0..2u8)).collect();
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let e = estimate(&seq);
        assert!(e.min_entropy > 0.95 && e.min_entropy <= 1.0, "{}", e.min_entropy);
    }

    #[test]
    fn test_uses_observed_alphabet_only() {
        // Two values out of 256 possible: at most ~1 bit, never 8.
        let mut rng = StdRng::seed_from_u64(5);
        let symbols: Vec<u8> = (0..200_000)
            .map(|_| if rng.random_bool(0.5) { 17 } else { 200 })
            .collect();
        let seq = SampleSequence::from_symbols(symbols, 8).unwrap();
        let e = estimate(&seq);
        assert_eq!(e.details["states"], 2.0);
        assert!(e.min_entropy < 1.0, "{}", e.min_entropy);
    }

    #[test]
    fn test_unleft_state_transitions_with_certainty() {
        // 3 appears only as the final sample, so every step out of it has p = 1
        // and the best path parks there after one unlikely move.
        let mut rng = StdRng::seed_from_u64(9);
        let mut symbols: Vec<u8> = (0..1_000).map(|_| rng.random_range(1..3u8)).collect();
        symbols.push(3);
        let seq = SampleSequence::from_symbols(symbols, 2).unwrap();
        let e = estimate(&seq);
        assert_eq!(e.details["states"], 3.0);
        assert!(e.details["log2_p_max"] > -8.0, "{}", e.details["log2_p_max"]);
        assert!(e.min_entropy < 0.1, "{}", e.min_entropy);
    }
}
