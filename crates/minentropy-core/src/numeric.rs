//! Numeric helpers shared by the estimators.
//!
//! - [`upper_bound`]: one-sided 99% upper confidence bound on a proportion.
//! - [`Bisection`]: root finder for the monotone equations of the collision
//!   and compression estimators, with an explicit tolerance and iteration
//!   budget.
//! - [`PredictorBounds`]: global and local predictability of the predictor
//!   family (MultiMCW, Lag, MultiMMC, LZ78Y).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Normal quantile for a one-sided 99% bound.
pub const Z_ALPHA: f64 = 2.576;

/// `min(1, p + Z·sqrt(p(1−p)/(n−1)))`.
pub fn upper_bound(p_hat: f64, n: usize) -> f64 {
    if n < 2 {
        return 1.0;
    }
    let spread = (p_hat * (1.0 - p_hat) / (n as f64 - 1.0)).max(0.0).sqrt();
    (p_hat + Z_ALPHA * spread).min(1.0)
}

/// `−log2 p`, clamped at zero.
pub fn min_entropy(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::INFINITY;
    }
    (-p.log2()).max(0.0)
}

// ---------------------------------------------------------------------------
// Bisection
// ---------------------------------------------------------------------------

/// Tolerance and iteration budget for bisection solvers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bisection {
    /// Accept `p` once `|f(p) − target| ≤ tolerance`.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for Bisection {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 200,
        }
    }
}

impl Bisection {
    /// Solve `f(p) = target` for a function decreasing on `[lo, hi]`.
    ///
    /// The caller is responsible for `f(hi) ≤ target ≤ f(lo)`; outside that
    /// bracket the search walks to the nearer end and fails to converge.
    pub fn solve_decreasing<F>(
        &self,
        estimator: &'static str,
        mut lo: f64,
        mut hi: f64,
        target: f64,
        f: F,
    ) -> Result<f64>
    where
        F: Fn(f64) -> f64,
    {
        let mut residual = f64::INFINITY;
        for _ in 0..self.max_iterations {
            let mid = lo + (hi - lo) / 2.0;
            let value = f(mid);
            residual = value - target;
            if residual.abs() <= self.tolerance {
                return Ok(mid);
            }
            if residual > 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Err(EngineError::Convergence {
            estimator,
            iterations: self.max_iterations,
            residual: residual.abs(),
        })
    }
}

// ---------------------------------------------------------------------------
// Predictor bounds
// ---------------------------------------------------------------------------

const LOCAL_CONFIDENCE: f64 = 0.99;
const LOCAL_ITERATIONS: usize = 64;

/// Outcome summary of a predictor run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorBounds {
    pub predictions: usize,
    pub correct: usize,
    pub longest_run: usize,
    pub p_global: f64,
    pub p_local: f64,
}

impl PredictorBounds {
    pub fn new(predictions: usize, correct: usize, longest_run: usize) -> Self {
        Self {
            predictions,
            correct,
            longest_run,
            p_global: p_global(correct, predictions),
            p_local: p_local(longest_run, predictions),
        }
    }

    /// `−log2 max(P_global, P_local, 1/2^b)`.
    pub fn min_entropy(&self, bits_per_sample: u8) -> f64 {
        let floor = 0.5f64.powi(bits_per_sample as i32);
        min_entropy(self.p_global.max(self.p_local).max(floor))
    }
}

/// Global predictability from `correct` hits out of `n` predictions.
pub fn p_global(correct: usize, n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    if correct == 0 {
        return 1.0 - 0.01f64.powf(1.0 / n as f64);
    }
    upper_bound(correct as f64 / n as f64, n)
}

fn run_root(p: f64, r: usize) -> f64 {
    let q = 1.0 - p;
    let pr = p.powi(r as i32);
    let mut x = 1.0f64;
    for _ in 0..10 {
        x = 1.0 + q * pr * x.powi(r as i32 + 1);
    }
    x
}

/// Probability of no success run of length `r` in `n` trials with per-trial
/// success probability `p`. Non-finite values collapse to zero.
fn no_run_probability(p: f64, r: usize, n: usize) -> f64 {
    let q = 1.0 - p;
    let x = run_root(p, r);
    let r = r as f64;
    let qn = (1.0 - p * x) / ((r + 1.0 - r * x) * q) * (-(n as f64 + 1.0) * x.ln()).exp();
    if qn.is_finite() { qn } else { 0.0 }
}

/// Local predictability from the longest run of correct predictions.
pub fn p_local(longest_run: usize, n: usize) -> f64 {
    if n == 0 || longest_run >= n {
        return 1.0;
    }
    let r = longest_run + 1;
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..LOCAL_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if no_run_probability(mid, r, n) > LOCAL_CONFIDENCE {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}
