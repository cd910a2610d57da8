//! Chi-square independence and goodness-of-fit checks.
//!
//! Expected counts are sorted ascending and merged greedily into bins of at
//! least [`MIN_EXPECTED`]; a trailing short bin is folded into its
//! predecessor. Scores are compared against the 0.001 upper critical value of
//! the chi-square distribution.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::sample::SampleSequence;

/// Smallest expected count a bin may hold.
pub const MIN_EXPECTED: f64 = 5.0;

/// Significance level of both checks.
pub const ALPHA: f64 = 0.001;

const SUBSEQUENCES: usize = 10;

/// Outcome of one chi-square check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChiSquareCheck {
    pub score: f64,
    pub degrees_of_freedom: usize,
    pub cutoff: f64,
    pub passed: bool,
}

impl ChiSquareCheck {
    fn new(score: f64, degrees_of_freedom: usize) -> Self {
        let cutoff = critical_value(degrees_of_freedom);
        Self {
            score,
            degrees_of_freedom,
            cutoff,
            passed: !(score > cutoff),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChiSquareResult {
    pub independence: ChiSquareCheck,
    pub goodness_of_fit: ChiSquareCheck,
}

impl ChiSquareResult {
    pub fn passed(&self) -> bool {
        self.independence.passed && self.goodness_of_fit.passed
    }
}

/// Upper `ALPHA` critical value; infinite (always pass) when `df = 0`.
pub fn critical_value(degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 {
        return f64::INFINITY;
    }
    ChiSquared::new(degrees_of_freedom as f64)
        .map(|dist| dist.inverse_cdf(1.0 - ALPHA))
        .unwrap_or(f64::INFINITY)
}

pub fn run(seq: &SampleSequence) -> ChiSquareResult {
    if seq.is_binary() {
        ChiSquareResult {
            independence: binary_independence(seq.symbols()),
            goodness_of_fit: binary_goodness_of_fit(seq.symbols()),
        }
    } else {
        ChiSquareResult {
            independence: independence(seq),
            goodness_of_fit: goodness_of_fit(seq),
        }
    }
}

/// Merge ascending `(expected, item)` pairs into bins. Returns each bin's
/// expected total and the bin of every item.
fn allocate_bins(sorted: &[(f64, usize)], items: usize) -> (Vec<f64>, Vec<usize>) {
    let mut values: Vec<f64> = Vec::new();
    let mut bin_of = vec![0usize; items];
    for &(expected, item) in sorted {
        match values.last_mut() {
            Some(last) if *last < MIN_EXPECTED => *last += expected,
            _ => values.push(expected),
        }
        bin_of[item] = values.len() - 1;
    }
    if values.len() > 1 && values.last().is_some_and(|&v| v < MIN_EXPECTED) {
        if let Some(short) = values.pop() {
            let target = values.len() - 1;
            values[target] += short;
            for bin in bin_of.iter_mut().filter(|b| **b > target) {
                *bin = target;
            }
        }
    }
    (values, bin_of)
}

fn score(observed: &[u64], expected: &[f64]) -> f64 {
    observed
        .iter()
        .zip(expected)
        .map(|(&o, &e)| (o as f64 - e).powi(2) / e)
        .sum()
}

/// Non-overlapping `m`-bit tuples against the product of bit frequencies.
fn binary_independence(bits: &[u8]) -> ChiSquareCheck {
    let n = bits.len();
    let p1 = bits.iter().map(|&b| b as f64).sum::<f64>() / n as f64;
    let p0 = 1.0 - p1;
    let min_p = p0.min(p1);

    let Some(m) = (2..=11usize)
        .rev()
        .find(|&m| min_p.powi(m as i32) * (n / m) as f64 >= MIN_EXPECTED)
    else {
        return ChiSquareCheck::new(0.0, 0);
    };

    let blocks = n / m;
    let mut occurrences = vec![0u64; 1 << m];
    for block in bits.chunks_exact(m) {
        let index = block.iter().fold(0usize, |acc, &b| (acc << 1) | b as usize);
        occurrences[index] += 1;
    }
    let expected: Vec<f64> = (0..1usize << m)
        .map(|pattern| {
            let ones = pattern.count_ones() as i32;
            p1.powi(ones) * p0.powi(m as i32 - ones) * blocks as f64
        })
        .collect();
    ChiSquareCheck::new(score(&occurrences, &expected), (1 << m) - 2)
}

/// Ones per sub-sequence against the overall bit frequency.
fn binary_goodness_of_fit(bits: &[u8]) -> ChiSquareCheck {
    let sub_len = bits.len() / SUBSEQUENCES;
    let used = &bits[..sub_len * SUBSEQUENCES];
    let p = used.iter().map(|&b| b as f64).sum::<f64>() / used.len() as f64;
    let expected = [(1.0 - p) * sub_len as f64, p * sub_len as f64];
    let total = used
        .chunks_exact(sub_len.max(1))
        .map(|chunk| {
            let ones = chunk.iter().map(|&b| b as u64).sum::<u64>();
            score(&[sub_len as u64 - ones, ones], &expected)
        })
        .sum();
    ChiSquareCheck::new(total, SUBSEQUENCES - 1)
}

/// Non-overlapping sample pairs against the product of symbol frequencies.
fn independence(seq: &SampleSequence) -> ChiSquareCheck {
    let alphabet = seq.alphabet();
    let k = alphabet.len();
    let n = seq.len() as f64;
    let mut index = [0usize; 256];
    for (i, &a) in alphabet.iter().enumerate() {
        index[a as usize] = i;
    }
    let p: Vec<f64> = alphabet
        .iter()
        .map(|&a| seq.histogram()[a as usize] as f64 / n)
        .collect();

    let mut expected: Vec<(f64, usize)> = (0..k * k)
        .map(|cell| (p[cell / k] * p[cell % k] * n / 2.0, cell))
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (bins, bin_of) = allocate_bins(&expected, k * k);

    let mut observed = vec![0u64; bins.len()];
    for pair in seq.symbols().chunks_exact(2) {
        let cell = index[pair[0] as usize] * k + index[pair[1] as usize];
        observed[bin_of[cell]] += 1;
    }
    let df = bins.len().saturating_sub(k);
    ChiSquareCheck::new(score(&observed, &bins), df)
}

/// Symbol counts of ten equal sub-sequences against their average.
fn goodness_of_fit(seq: &SampleSequence) -> ChiSquareCheck {
    let alphabet = seq.alphabet();
    let k = alphabet.len();
    let mut index = [0usize; 256];
    for (i, &a) in alphabet.iter().enumerate() {
        index[a as usize] = i;
    }
    let sub_len = seq.len() / SUBSEQUENCES;
    let used = &seq.symbols()[..sub_len * SUBSEQUENCES];

    let mut per_sub = vec![vec![0u64; k]; SUBSEQUENCES];
    for (counts, chunk) in per_sub.iter_mut().zip(used.chunks_exact(sub_len.max(1))) {
        for &s in chunk {
            counts[index[s as usize]] += 1;
        }
    }
    let mut expected: Vec<(f64, usize)> = (0..k)
        .map(|i| {
            let total: u64 = per_sub.iter().map(|c| c[i]).sum();
            (total as f64 / SUBSEQUENCES as f64, i)
        })
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (bins, bin_of) = allocate_bins(&expected, k);

    let total = per_sub
        .iter()
        .map(|counts| {
            let mut observed = vec![0u64; bins.len()];
            for (i, &c) in counts.iter().enumerate() {
                observed[bin_of[i]] += c;
            }
            score(&observed, &bins)
        })
        .sum();
    let df = (SUBSEQUENCES - 1) * bins.len().saturating_sub(1);
    ChiSquareCheck::new(total, df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_critical_values() {
        // Tabulated 0.001 upper critical values.
        assert!((critical_value(1) - 10.828).abs() < 1e-2);
        assert!((critical_value(9) - 27.877).abs() < 1e-2);
        assert_eq!(critical_value(0), f64::INFINITY);
    }

    #[test]
    fn test_bins_merge_small_expectations() {
        let sorted = [(1.0, 0), (2.0, 1), (3.0, 2), (10.0, 3), (2.0, 4)];
        let (values, bin_of) = allocate_bins(&sorted, 5);
        assert_eq!(values, vec![6.0, 12.0]);
        assert_eq!(bin_of, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_random_bits_pass() {
        let mut rng = StdRng::seed_from_u64(41);
        let bits: Vec<u8> = (0..100_000).map(|_| rng.random_range(0..2u8)).collect();
        let seq = SampleSequence::from_symbols(bits, 1).unwrap();
        let result = run(&seq);
        assert!(result.independence.degrees_of_freedom > 0);
        assert_eq!(result.goodness_of_fit.degrees_of_freedom, 9);
        assert!(result.passed(), "{result:?}");
    }

    #[test]
    fn test_dependent_pairs_fail_independence() {
        // Second element of every pair copies the first.
        let mut rng = StdRng::seed_from_u64(42);
        let mut symbols = Vec::with_capacity(100_000);
        for _ in 0..50_000 {
            let s = rng.random_range(0..8u8);
            symbols.push(s);
            symbols.push(s);
        }
        let seq = SampleSequence::from_symbols(symbols, 3).unwrap();
        assert!(!run(&seq).independence.passed);
    }

    #[test]
    fn test_drifting_distribution_fails_goodness_of_fit() {
        // Values grow with position: each tenth has its own distribution.
        let symbols: Vec<u8> = (0..100_000).map(|i| ((i / 10_000) % 8) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 3).unwrap();
        assert!(!run(&seq).goodness_of_fit.passed);
    }
}
