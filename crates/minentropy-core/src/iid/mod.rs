//! IID permutation tester.
//!
//! Computes the nineteen test statistics on the original sequence, then on
//! many random shuffles of it. A statistic whose original value is extreme
//! among the shuffled values is evidence of ordering structure, so the data
//! is not IID.
//!
//! # Parallelism
//!
//! Shuffles run in batches spread over scoped worker threads. Shuffle `i`
//! draws from an RNG seeded with `(seed, i)`, so the verdict does not depend
//! on the number of workers. Per-statistic tallies merge commutatively at the
//! end of each batch; once no statistic can still fail, the remaining
//! shuffles are skipped.
//!
//! # Failure mode
//!
//! Data the statistics cannot handle (one symbol, too few samples, undefined
//! statistic values, a panicking statistic) yields
//! [`IidDecision::Inconclusive`], which routes to the non-IID suite.

pub mod chi_square;
pub mod statistics;

use std::panic::{AssertUnwindSafe, catch_unwind};

use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::combiner::DecisionPath;
use crate::sample::SampleSequence;
use crate::suffix::RepeatProfile;
use chi_square::ChiSquareResult;
use statistics::{STATISTIC_COUNT, STATISTIC_NAMES, StatisticContext};

/// Shortest non-binary sequence the statistics are defined for.
pub const MIN_LEN: usize = 64;
/// Shortest binary sequence: 64 blocks after the 8-bit conversions.
pub const MIN_BINARY_LEN: usize = 512;

/// Significance level of the longest-repeat check.
const LRS_ALPHA: f64 = 0.001;

/// Shuffles between early-exit checks. Fixed so the stopping point does not
/// depend on the worker count.
const BATCH: usize = 64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Permutation-test settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermutationConfig {
    pub permutations: usize,
    /// Extreme ranks that count as rejection. 0 rejects only when the
    /// original lies strictly outside the permuted range.
    pub rank_tail: usize,
    /// RNG seed; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Worker threads; available parallelism when absent.
    pub workers: Option<usize>,
    /// Also run the chi-square and longest-repeat checks.
    pub supplementary_checks: bool,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        Self {
            permutations: 10_000,
            rank_tail: 0,
            seed: None,
            workers: None,
            supplementary_checks: true,
        }
    }
}

impl PermutationConfig {
    /// The standard's 10,000 shuffles with a rank tail of 5.
    pub fn sp800_90b() -> Self {
        Self {
            rank_tail: 5,
            ..Self::default()
        }
    }

    fn worker_count(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
            .max(1)
    }

    fn resolve_seed(&self) -> u64 {
        if let Some(seed) = self.seed {
            return seed;
        }
        let mut buf = [0u8; 8];
        match getrandom::fill(&mut buf) {
            Ok(()) => u64::from_le_bytes(buf),
            Err(e) => {
                log::warn!("OS randomness unavailable ({e}); seeding from the thread RNG");
                rand::random()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IidDecision {
    Iid,
    NonIid,
    Inconclusive,
}

impl std::fmt::Display for IidDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iid => write!(f, "IID"),
            Self::NonIid => write!(f, "non-IID"),
            Self::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Running reduction of one statistic over the shuffles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tally {
    pub original: f64,
    pub min: f64,
    pub max: f64,
    /// Shuffles whose statistic exceeded the original.
    pub greater: usize,
    /// Shuffles whose statistic equalled the original.
    pub equal: usize,
}

impl Tally {
    fn new(original: f64) -> Self {
        Self {
            original,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            greater: 0,
            equal: 0,
        }
    }

    fn observe(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if value > self.original {
            self.greater += 1;
        } else if value == self.original {
            self.equal += 1;
        }
    }

    fn merge(&mut self, other: &Tally) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.greater += other.greater;
        self.equal += other.equal;
    }

    /// Shuffles at or below the original.
    fn at_most(&self, run: usize) -> usize {
        run - self.greater
    }

    fn rejects(&self, permutations: usize, rank_tail: usize) -> bool {
        self.greater + self.equal <= rank_tail
            || self.greater >= permutations.saturating_sub(rank_tail)
    }

    /// No further shuffle can turn this statistic into a rejection.
    fn settled(&self, run: usize, rank_tail: usize) -> bool {
        self.greater + self.equal > rank_tail && self.at_most(run) > rank_tail
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticResult {
    pub name: &'static str,
    #[serde(flatten)]
    pub tally: Tally,
    pub passed: bool,
}

/// Longest-repeat plausibility under the IID assumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LrsCheck {
    pub longest_repeat: usize,
    pub collision_probability: f64,
    /// Probability of a repeat at least this long.
    pub probability: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IidVerdict {
    pub decision: IidDecision,
    pub statistics: Vec<StatisticResult>,
    pub chi_square: Option<ChiSquareResult>,
    pub lrs: Option<LrsCheck>,
    pub permutations_run: usize,
    /// Why the test was inconclusive.
    pub reason: Option<String>,
}

impl IidVerdict {
    fn inconclusive(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::warn!("IID test inconclusive: {reason}; using the non-IID estimators");
        Self {
            decision: IidDecision::Inconclusive,
            statistics: Vec::new(),
            chi_square: None,
            lrs: None,
            permutations_run: 0,
            reason: Some(reason),
        }
    }

    /// Estimator path this verdict selects.
    pub fn route(&self) -> DecisionPath {
        match self.decision {
            IidDecision::Iid => DecisionPath::Iid,
            IidDecision::NonIid | IidDecision::Inconclusive => DecisionPath::NonIid,
        }
    }
}

// ---------------------------------------------------------------------------
// Longest-repeat check
// ---------------------------------------------------------------------------

pub fn lrs_check(seq: &SampleSequence) -> LrsCheck {
    let n = seq.len() as f64;
    let collision_probability: f64 = seq
        .histogram()
        .iter()
        .map(|&c| (c as f64 / n).powi(2))
        .sum();
    let w = RepeatProfile::new(seq.symbols()).longest_repeat();
    let probability = if w == 0 {
        1.0
    } else {
        let starts = n - w as f64 + 1.0;
        let pairs = starts * (starts - 1.0) / 2.0;
        let p_w = collision_probability.powi(w as i32);
        -(pairs * (-p_w).ln_1p()).exp_m1()
    };
    LrsCheck {
        longest_repeat: w,
        collision_probability,
        probability,
        passed: probability >= LRS_ALPHA,
    }
}

// ---------------------------------------------------------------------------
// Tester
// ---------------------------------------------------------------------------

pub struct IidTester {
    config: PermutationConfig,
}

impl IidTester {
    pub fn new(config: PermutationConfig) -> Self {
        Self { config }
    }

    pub fn test(&self, seq: &SampleSequence) -> IidVerdict {
        if seq.alphabet_size() <= 1 {
            return IidVerdict::inconclusive("a single distinct value");
        }
        let min_len = if seq.is_binary() { MIN_BINARY_LEN } else { MIN_LEN };
        if seq.len() < min_len {
            return IidVerdict::inconclusive(format!(
                "{} samples, statistics need at least {min_len}",
                seq.len()
            ));
        }

        let ctx = StatisticContext {
            mean: seq.mean(),
            median: seq.median(),
            binary: seq.is_binary(),
        };
        let computed = catch_unwind(AssertUnwindSafe(|| {
            statistics::compute(seq.symbols(), &ctx)
        }));
        let original = match computed {
            Ok(values) => values,
            Err(_) => return IidVerdict::inconclusive("a test statistic panicked"),
        };
        if let Some(i) = original.iter().position(|v| !v.is_finite()) {
            return IidVerdict::inconclusive(format!("{} is undefined", STATISTIC_NAMES[i]));
        }

        let Some((tallies, run)) = self.permute(seq, &ctx, &original) else {
            return IidVerdict::inconclusive("a test statistic panicked during shuffling");
        };

        let tail = self.config.rank_tail;
        let statistics: Vec<StatisticResult> = STATISTIC_NAMES
            .iter()
            .zip(&tallies)
            .map(|(&name, tally)| StatisticResult {
                name,
                tally: *tally,
                passed: !tally.rejects(run, tail),
            })
            .collect();
        let permutation_pass = statistics.iter().all(|s| s.passed);

        let (chi_square, lrs) = if self.config.supplementary_checks {
            (Some(chi_square::run(seq)), Some(lrs_check(seq)))
        } else {
            (None, None)
        };
        let supplementary_pass = chi_square.as_ref().is_none_or(|c| c.passed())
            && lrs.as_ref().is_none_or(|l| l.passed);

        let decision = if permutation_pass && supplementary_pass {
            IidDecision::Iid
        } else {
            IidDecision::NonIid
        };
        for s in statistics.iter().filter(|s| !s.passed) {
            log::info!(
                "{} rejects IID: original {} outside permuted range [{}, {}]",
                s.name,
                s.tally.original,
                s.tally.min,
                s.tally.max
            );
        }
        log::info!("IID test: {decision} after {run} permutations");

        IidVerdict {
            decision,
            statistics,
            chi_square,
            lrs,
            permutations_run: run,
            reason: None,
        }
    }

    /// Run the shuffles; `None` if a worker panicked.
    fn permute(
        &self,
        seq: &SampleSequence,
        ctx: &StatisticContext,
        original: &[f64; STATISTIC_COUNT],
    ) -> Option<([Tally; STATISTIC_COUNT], usize)> {
        let total = self.config.permutations;
        let tail = self.config.rank_tail;
        let workers = self.config.worker_count();
        let seed = self.config.resolve_seed();

        let mut tallies = original.map(Tally::new);
        let mut run = 0usize;

        while run < total {
            let end = (run + BATCH).min(total);
            let chunk = (end - run).div_ceil(workers);
            let partials = std::thread::scope(|s| {
                let handles: Vec<_> = (run..end)
                    .step_by(chunk)
                    .map(|start| {
                        let stop = (start + chunk).min(end);
                        s.spawn(move || {
                            shuffle_range(seq.symbols(), ctx, original, seed, start..stop)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join())
                    .collect::<Result<Vec<_>, _>>()
            })
            .ok()?;

            for partial in &partials {
                for (t, p) in tallies.iter_mut().zip(partial) {
                    t.merge(p);
                }
            }
            run = end;
            log::debug!("permutation test: {run}/{total}");

            if tallies.iter().all(|t| t.settled(run, tail)) {
                log::debug!("permutation test settled early after {run} shuffles");
                break;
            }
        }
        Some((tallies, run))
    }
}

fn permutation_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn shuffle_range(
    symbols: &[u8],
    ctx: &StatisticContext,
    original: &[f64; STATISTIC_COUNT],
    seed: u64,
    range: std::ops::Range<usize>,
) -> [Tally; STATISTIC_COUNT] {
    let mut tallies = original.map(Tally::new);
    let mut buf = symbols.to_vec();
    for index in range {
        buf.copy_from_slice(symbols);
        buf.shuffle(&mut permutation_rng(seed, index));
        for (t, v) in tallies.iter_mut().zip(statistics::compute(&buf, ctx)) {
            t.observe(v);
        }
    }
    tallies
}
