//! Min-entropy estimator suite.
//!
//! Every estimator is a pure function of a [`SampleSequence`]: it allocates
//! its own state, never mutates the input and returns an entropy per sample
//! in `[0, b]` together with the intermediate quantities it derived.
//!
//! The IID path runs [`EstimatorKind::IID`]; the non-IID path runs all ten in
//! [`EstimatorKind::NON_IID`].

pub mod collision;
pub mod compression;
pub mod lag;
pub mod lrs;
pub mod lz78y;
pub mod markov;
pub mod mcv;
pub mod multi_mcw;
pub mod multi_mmc;
pub mod predictor;
pub mod tuple;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::numeric::Bisection;
use crate::sample::SampleSequence;
use crate::suffix::RepeatProfile;

/// Tunables shared by the estimators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    /// Bisection contract of the collision and compression estimators.
    pub bisection: Bisection,
}

/// The ten estimators, in canonical reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EstimatorKind {
    #[serde(rename = "Most Common Value")]
    MostCommonValue,
    #[serde(rename = "Collision")]
    Collision,
    #[serde(rename = "Markov")]
    Markov,
    #[serde(rename = "Compression")]
    Compression,
    #[serde(rename = "t-Tuple")]
    TTuple,
    #[serde(rename = "LRS")]
    LongestRepeatedSubstring,
    #[serde(rename = "MultiMCW")]
    MultiMcw,
    #[serde(rename = "Lag")]
    Lag,
    #[serde(rename = "MultiMMC")]
    MultiMmc,
    #[serde(rename = "LZ78Y")]
    Lz78y,
}

impl EstimatorKind {
    /// Reduced suite for data that passed the IID test.
    pub const IID: [Self; 2] = [Self::MostCommonValue, Self::Collision];

    /// Full suite for data that is not (or could not be shown to be) IID.
    pub const NON_IID: [Self; 10] = [
        Self::MostCommonValue,
        Self::Collision,
        Self::Markov,
        Self::Compression,
        Self::TTuple,
        Self::LongestRepeatedSubstring,
        Self::MultiMcw,
        Self::Lag,
        Self::MultiMmc,
        Self::Lz78y,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MostCommonValue => "Most Common Value",
            Self::Collision => "Collision",
            Self::Markov => "Markov",
            Self::Compression => "Compression",
            Self::TTuple => "t-Tuple",
            Self::LongestRepeatedSubstring => "LRS",
            Self::MultiMcw => "MultiMCW",
            Self::Lag => "Lag",
            Self::MultiMmc => "MultiMMC",
            Self::Lz78y => "LZ78Y",
        }
    }

    /// Run this estimator over `seq`.
    ///
    /// A sequence with fewer than two distinct values has zero entropy and
    /// short-circuits before any statistic is computed. The result is
    /// clamped to `[0, b]`.
    pub fn estimate(self, seq: &SampleSequence, settings: &EstimatorSettings) -> Result<Estimate> {
        self.estimate_shared(seq, settings, &OnceLock::new())
    }

    /// Like [`estimate`](Self::estimate), but t-Tuple and LRS take their
    /// repeat profile of `seq` from `profile`, building it on first use.
    /// Callers running both over one view pass the same cell so the suffix
    /// array is built once.
    pub fn estimate_shared(
        self,
        seq: &SampleSequence,
        settings: &EstimatorSettings,
        profile: &OnceLock<RepeatProfile>,
    ) -> Result<Estimate> {
        if seq.alphabet_size() <= 1 {
            return Ok(Estimate::new(0.0));
        }
        let repeats = move || profile.get_or_init(move || RepeatProfile::new(seq.symbols()));
        let estimate = match self {
            Self::MostCommonValue => mcv::estimate(seq),
            Self::Collision => collision::estimate(seq, &settings.bisection)?,
            Self::Markov => markov::estimate(seq),
            Self::Compression => compression::estimate(seq, &settings.bisection)?,
            Self::TTuple => tuple::estimate_with_profile(seq.len(), repeats()),
            Self::LongestRepeatedSubstring => {
                lrs::estimate_with_profile(seq.len(), seq.bits_per_sample(), repeats())
            }
            Self::MultiMcw => multi_mcw::estimate(seq),
            Self::Lag => lag::estimate(seq),
            Self::MultiMmc => multi_mmc::estimate(seq),
            Self::Lz78y => lz78y::estimate(seq),
        };
        Ok(estimate.clamped(seq.bits_per_sample() as f64))
    }
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rendition of the data an estimate was computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Original,
    /// Samples expanded to single bits; the estimate is scaled back by `b`.
    Bitstring,
}

/// Entropy per sample plus the named intermediates behind it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Estimate {
    pub min_entropy: f64,
    pub details: BTreeMap<&'static str, f64>,
}

impl Estimate {
    pub fn new(min_entropy: f64) -> Self {
        Self {
            min_entropy,
            details: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, value: f64) -> Self {
        self.details.insert(name, value);
        self
    }

    fn clamped(mut self, max: f64) -> Self {
        self.min_entropy = if self.min_entropy.is_nan() {
            0.0
        } else {
            self.min_entropy.clamp(0.0, max)
        };
        self
    }
}

/// One estimator's contribution to the final minimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEstimate {
    pub estimator: EstimatorKind,
    pub view: View,
    /// Bits per original sample.
    pub min_entropy: f64,
    pub details: BTreeMap<&'static str, f64>,
}

impl CandidateEstimate {
    pub fn new(estimator: EstimatorKind, view: View, estimate: Estimate) -> Self {
        Self {
            estimator,
            view,
            min_entropy: estimate.min_entropy,
            details: estimate.details,
        }
    }

    /// Report key: the estimator name, suffixed for the bit view.
    pub fn key(&self) -> String {
        match self.view {
            View::Original => self.estimator.name().to_string(),
            View::Bitstring => format!("{} (bitstring)", self.estimator.name()),
        }
    }
}
