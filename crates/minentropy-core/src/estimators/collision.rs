//! Collision estimate.
//!
//! The sequence is scanned for the first repeated value; the scan length is
//! one collision distance and the scan restarts after it. The lower
//! confidence bound on the mean distance is matched against the expected
//! distance of a near-uniform distribution whose most likely value has
//! probability `p`.

use super::Estimate;
use crate::error::Result;
use crate::numeric::{Bisection, Z_ALPHA, min_entropy};
use crate::sample::SampleSequence;

const NAME: &str = "Collision";

/// Distances between successive collisions.
pub fn collision_distances(symbols: &[u8]) -> Vec<u32> {
    let mut distances = Vec::new();
    let mut seen = [false; 256];
    let mut start = 0usize;
    for (i, &s) in symbols.iter().enumerate() {
        if seen[s as usize] {
            distances.push((i - start + 1) as u32);
            seen = [false; 256];
            start = i + 1;
        } else {
            seen[s as usize] = true;
        }
    }
    distances
}

/// Continued-fraction evaluation of the incomplete-gamma term at `z = 1/q`.
fn continued_fraction(q: f64, k: usize) -> f64 {
    let z = 1.0 / q;
    let k_f = k as f64;
    let mut denom = 1.0 + k_f / z;
    for i in 1..k {
        let i = i as f64;
        denom = z - i / denom;
        denom = 1.0 + (k_f - i) / denom;
    }
    denom = z - k_f / denom;
    1.0 / denom
}

/// Expected collision distance when one of `k` values has probability `p`
/// and the rest share `1 − p` evenly.
pub fn expected_distance(p: f64, k: usize) -> f64 {
    let k_f = k as f64;
    let q = (1.0 - p) / (k_f - 1.0);
    let p_inv = 1.0 / p;
    let q_inv = 1.0 / q;
    let pq_k = (p_inv - q_inv) / k_f;
    p * q_inv * q_inv * (1.0 + pq_k) * continued_fraction(q, k) - p * q_inv * pq_k
}

/// Solve `expected_distance(p, k) = target` for `p ∈ [1/k, 1)`.
pub fn solve_for_p(target: f64, k: usize, bisection: &Bisection) -> Result<f64> {
    bisection.solve_decreasing(NAME, 1.0 / k as f64, 1.0, target, |p| {
        expected_distance(p, k)
    })
}

pub fn estimate(seq: &SampleSequence, bisection: &Bisection) -> Result<Estimate> {
    let b = seq.bits_per_sample() as f64;
    let k = seq.max_symbols();
    let distances = collision_distances(seq.symbols());
    let v = distances.len();
    if v < 2 {
        return Ok(Estimate::new(0.0).with("collisions", v as f64));
    }

    let v_f = v as f64;
    let mean = distances.iter().map(|&d| d as f64).sum::<f64>() / v_f;
    let var = distances
        .iter()
        .map(|&d| (d as f64 - mean).powi(2))
        .sum::<f64>()
        / (v_f - 1.0);
    let lower = mean - Z_ALPHA * var.sqrt() / v_f.sqrt();

    let base = Estimate::new(0.0)
        .with("collisions", v_f)
        .with("mean", mean)
        .with("lower_bound", lower);

    if lower <= 2.0 {
        return Ok(base);
    }
    if lower >= expected_distance(1.0 / k as f64, k) {
        return Ok(Estimate { min_entropy: b, ..base });
    }
    let p = solve_for_p(lower, k, bisection)?;
    Ok(Estimate {
        min_entropy: min_entropy(p),
        ..base.with("p", p)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_distances_restart_after_collision() {
        assert_eq!(collision_distances(&[0, 1, 0, 1, 1, 0, 0]), vec![3, 2, 2]);
        assert!(collision_distances(&[0, 1, 2, 3]).is_empty());
    }

    #[test]
    fn test_binary_expected_distance_closed_form() {
        for p in [0.5, 0.6, 0.75, 0.9, 0.99] {
            let e = expected_distance(p, 2);
            let closed = 2.0 + 2.0 * p * (1.0 - p);
            assert!((e - closed).abs() < 1e-9, "p={p}: {e} vs {closed}");
        }
    }

    #[test]
    fn test_expected_distance_decreasing() {
        for k in [4usize, 16, 256] {
            let mut prev = f64::INFINITY;
            for i in 0..20 {
                let p = 1.0 / k as f64 + (1.0 - 1.0 / k as f64) * i as f64 / 21.0;
                let e = expected_distance(p, k);
                assert!(e < prev, "k={k} p={p}");
                prev = e;
            }
        }
    }

    #[test]
    fn test_bisection_recovers_binary_p() {
        let p = solve_for_p(2.42, 2, &Bisection::default()).unwrap();
        assert!((p - 0.7).abs() < 1e-4, "p = {p}");
    }

    #[test]
    fn test_bisection_budget_exhausted() {
        let tight = Bisection {
            tolerance: 1e-6,
            max_iterations: 1,
        };
        let err = solve_for_p(2.42, 2, &tight).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Convergence {
                estimator: "Collision",
                iterations: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_too_few_collisions() {
        let seq = SampleSequence::from_symbols(vec![0, 1, 2, 3, 0], 2).unwrap();
        let e = estimate(&seq, &Bisection::default()).unwrap();
        assert_eq!(e.min_entropy, 0.0);
    }

    #[test]
    fn test_sparse_ones_low_entropy() {
        // Mean distance 20/9, so p(1 − p) ≈ 1/9 and p ≈ 0.87.
        let symbols: Vec<u8> = (0..100_000).map(|i| (i % 10 == 0) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let e = estimate(&seq, &Bisection::default()).unwrap();
        assert!(e.min_entropy > 0.0 && e.min_entropy < 0.3, "{}", e.min_entropy);
    }

    #[test]
    fn test_regular_alternation_reads_as_full_entropy() {
        // Collision distances alone cannot see periodic structure.
        let symbols: Vec<u8> = (0..10_000).map(|i| (i % 2) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let e = estimate(&seq, &Bisection::default()).unwrap();
        assert_eq!(e.min_entropy, 1.0);
    }
}
