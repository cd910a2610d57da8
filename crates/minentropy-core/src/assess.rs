//! Assessment driver: sample store → IID test → estimator path → combiner.

use std::sync::OnceLock;
use std::time::Instant;

use log::{debug, info, warn};

use crate::combiner::{Combiner, DecisionPath, FinalReport};
use crate::config::{AssessmentConfig, TestMode};
use crate::error::Result;
use crate::estimators::{CandidateEstimate, EstimatorKind, EstimatorSettings, View};
use crate::iid::{IidTester, IidVerdict};
use crate::sample::{DEFAULT_BITSTRING_LIMIT, SampleSequence, SampleStore};
use crate::suffix::RepeatProfile;

/// Assess raw bytes end to end.
pub fn assess(raw: &[u8], config: &AssessmentConfig) -> Result<FinalReport> {
    config.validate()?;
    let seq = SampleStore::load(raw, &config.samples)?;
    assess_sequence(&seq, config)
}

/// Assess an already-built sequence. Sample options in `config` are ignored.
pub fn assess_sequence(seq: &SampleSequence, config: &AssessmentConfig) -> Result<FinalReport> {
    if seq.is_constant() {
        warn!("input holds a single distinct value; every estimate is 0 bits");
    }

    let verdict: Option<IidVerdict> = match config.mode {
        TestMode::Iid => Some(IidTester::new(config.permutation.clone()).test(seq)),
        TestMode::NonIid => None,
    };
    let path = verdict
        .as_ref()
        .map_or(DecisionPath::NonIid, IidVerdict::route);
    info!("estimator path: {path}");

    let candidates = run_path(path, seq, config)?;
    let report = Combiner::new(config.precision).combine(
        path,
        seq.bits_per_sample(),
        seq.len(),
        candidates,
        verdict,
    );
    info!(
        "final min-entropy: {} bits/sample ({})",
        report.final_estimate_bits, report.winning_estimator_name
    );
    Ok(report)
}

/// Run every estimator of `path`, plus the bit view when enabled, in
/// parallel. The first estimator error aborts the run. Each view's repeat
/// profile is built at most once and shared by t-Tuple and LRS.
pub fn run_path(
    path: DecisionPath,
    seq: &SampleSequence,
    config: &AssessmentConfig,
) -> Result<Vec<CandidateEstimate>> {
    let bits = seq.bits_per_sample();
    // A constant sequence is 0 bits outright; its bit view would only add noise.
    let bit_view = (config.bitstring && bits > 1 && !seq.is_constant())
        .then(|| seq.bitstring(Some(DEFAULT_BITSTRING_LIMIT)));
    let original_profile = OnceLock::new();
    let bit_profile = OnceLock::new();

    let mut jobs: Vec<Job<'_>> = path
        .estimators()
        .iter()
        .map(|&kind| Job {
            kind,
            view: View::Original,
            data: seq,
            profile: &original_profile,
        })
        .collect();
    if let Some(view) = &bit_view {
        jobs.extend(path.estimators().iter().map(|&kind| Job {
            kind,
            view: View::Bitstring,
            data: view,
            profile: &bit_profile,
        }));
    }

    let width = config.workers.unwrap_or(jobs.len()).max(1);
    let settings = &config.estimators;
    let mut candidates = Vec::with_capacity(jobs.len());
    for group in jobs.chunks(width) {
        let results: Vec<Result<CandidateEstimate>> = std::thread::scope(|s| {
            let handles: Vec<_> = group
                .iter()
                .map(|job| s.spawn(move || job.run(bits, settings)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });
        for result in results {
            candidates.push(result?);
        }
    }
    Ok(candidates)
}

struct Job<'a> {
    kind: EstimatorKind,
    view: View,
    data: &'a SampleSequence,
    profile: &'a OnceLock<RepeatProfile>,
}

impl Job<'_> {
    fn run(&self, bits: u8, settings: &EstimatorSettings) -> Result<CandidateEstimate> {
        let started = Instant::now();
        let mut estimate = self.kind.estimate_shared(self.data, settings, self.profile)?;
        if self.view == View::Bitstring {
            estimate.min_entropy *= bits as f64;
        }
        let candidate = CandidateEstimate::new(self.kind, self.view, estimate);
        debug!(
            "{}: {:.6} bits/sample in {:.2?}",
            candidate.key(),
            candidate.min_entropy,
            started.elapsed()
        );
        Ok(candidate)
    }
}
