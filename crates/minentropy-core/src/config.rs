//! Assessment configuration.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "samples": { "bits_per_sample": 4 }, "mode": "non-iid", "precision": 3 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::estimators::EstimatorSettings;
use crate::iid::PermutationConfig;
use crate::sample::SampleOptions;

/// Whether the IID permutation test runs before choosing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestMode {
    /// Test for IID; pass → reduced suite, otherwise the full suite.
    #[default]
    Iid,
    /// Skip the test and run the full suite.
    NonIid,
}

/// Largest supported reporting precision, in decimal places.
pub const MAX_PRECISION: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub samples: SampleOptions,
    pub mode: TestMode,
    pub permutation: PermutationConfig,
    pub estimators: EstimatorSettings,
    /// Also assess the bit view when samples are wider than one bit.
    pub bitstring: bool,
    /// Decimal places kept (rounded down) in reported estimates.
    pub precision: Option<u32>,
    /// Estimators run at once; all of them when absent.
    pub workers: Option<usize>,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            samples: SampleOptions::default(),
            mode: TestMode::Iid,
            permutation: PermutationConfig::default(),
            estimators: EstimatorSettings::default(),
            bitstring: true,
            precision: None,
            workers: None,
        }
    }
}

impl AssessmentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Reject settings no run could honour.
    pub fn validate(&self) -> Result<()> {
        let bits = self.samples.bits_per_sample;
        if !(1..=8).contains(&bits) {
            return Err(EngineError::InvalidBitsPerSample { bits });
        }
        if self.mode == TestMode::Iid && self.permutation.permutations == 0 {
            return Err(EngineError::Config(
                "the IID test needs at least one permutation".into(),
            ));
        }
        if self.workers == Some(0) || self.permutation.workers == Some(0) {
            return Err(EngineError::Config("workers must be at least 1".into()));
        }
        let bisection = &self.estimators.bisection;
        if !(bisection.tolerance > 0.0) || bisection.max_iterations == 0 {
            return Err(EngineError::Config(
                "bisection needs a positive tolerance and at least one iteration".into(),
            ));
        }
        if self.precision.is_some_and(|p| p > MAX_PRECISION) {
            return Err(EngineError::Config(format!(
                "precision is limited to {MAX_PRECISION} decimal places"
            )));
        }
        Ok(())
    }
}
