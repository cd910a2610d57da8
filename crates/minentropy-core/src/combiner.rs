//! Entropy combiner: reduces candidate estimates to the Final Report.
//!
//! Each candidate is clamped to `[0, b]` and, when a reporting precision is
//! set, rounded down. The final estimate is the exact minimum of those
//! reported values, so it can never exceed any per-estimator figure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::estimators::{CandidateEstimate, EstimatorKind};
use crate::iid::IidVerdict;

/// Which estimator suite produced the candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionPath {
    #[serde(rename = "iid")]
    Iid,
    #[serde(rename = "non-iid")]
    NonIid,
}

impl DecisionPath {
    pub fn estimators(self) -> &'static [EstimatorKind] {
        match self {
            Self::Iid => &EstimatorKind::IID,
            Self::NonIid => &EstimatorKind::NON_IID,
        }
    }
}

impl std::fmt::Display for DecisionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iid => write!(f, "iid"),
            Self::NonIid => write!(f, "non-iid"),
        }
    }
}

/// Outcome of one assessment run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub final_estimate_bits: f64,
    pub winning_estimator_name: String,
    pub decision_path: DecisionPath,
    pub per_estimator_estimates: BTreeMap<String, f64>,
    pub bits_per_sample: u8,
    pub sample_count: usize,
    pub iid_verdict: Option<IidVerdict>,
    /// Candidates in canonical order, values as reported.
    pub candidates: Vec<CandidateEstimate>,
}

/// Minimum, clamp and round-down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Combiner {
    /// Decimal places kept in reported values; exact when `None`.
    pub precision: Option<u32>,
}

impl Combiner {
    pub fn new(precision: Option<u32>) -> Self {
        Self { precision }
    }

    /// Clamp into `[0, max]`, then truncate toward zero at the precision.
    pub fn normalize(&self, value: f64, max: f64) -> f64 {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, max) };
        match self.precision {
            Some(p) => {
                let scale = 10f64.powi(p as i32);
                (clamped * scale).floor() / scale
            }
            None => clamped,
        }
    }

    pub fn combine(
        &self,
        path: DecisionPath,
        bits_per_sample: u8,
        sample_count: usize,
        mut candidates: Vec<CandidateEstimate>,
        iid_verdict: Option<IidVerdict>,
    ) -> FinalReport {
        let max = bits_per_sample as f64;
        candidates.sort_by_key(|c| (c.estimator, c.view));

        let mut per_estimator_estimates = BTreeMap::new();
        let mut winner: Option<(f64, String)> = None;
        for candidate in &mut candidates {
            candidate.min_entropy = self.normalize(candidate.min_entropy, max);
            let key = candidate.key();
            if winner.as_ref().is_none_or(|(best, _)| candidate.min_entropy < *best) {
                winner = Some((candidate.min_entropy, key.clone()));
            }
            per_estimator_estimates.insert(key, candidate.min_entropy);
        }
        let (final_estimate_bits, winning_estimator_name) =
            winner.unwrap_or_else(|| (0.0, "none".to_string()));

        FinalReport {
            final_estimate_bits,
            winning_estimator_name,
            decision_path: path,
            per_estimator_estimates,
            bits_per_sample,
            sample_count,
            iid_verdict,
            candidates,
        }
    }
}

impl std::fmt::Display for FinalReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Min-entropy assessment ({} path)", self.decision_path)?;
        writeln!(
            f,
            "  {} samples x {} bits",
            self.sample_count, self.bits_per_sample
        )?;
        if let Some(verdict) = &self.iid_verdict {
            write!(f, "  IID test: {}", verdict.decision)?;
            match &verdict.reason {
                Some(reason) => writeln!(f, " ({reason})")?,
                None => writeln!(f, " ({} permutations)", verdict.permutations_run)?,
            }
        }
        writeln!(f)?;
        writeln!(f, "  {:<32} {:>14}", "Estimator", "bits/sample")?;
        writeln!(f, "  {}", "─".repeat(47))?;
        for candidate in &self.candidates {
            let key = candidate.key();
            let marker = if key == self.winning_estimator_name { " *" } else { "" };
            writeln!(f, "  {:<32} {:>14.6}{marker}", key, candidate.min_entropy)?;
        }
        writeln!(f, "  {}", "─".repeat(47))?;
        write!(
            f,
            "  Final estimate: {:.6} bits/sample ({})",
            self.final_estimate_bits, self.winning_estimator_name
        )
    }
}
