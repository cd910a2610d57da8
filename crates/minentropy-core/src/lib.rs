//! # minentropy-core
//!
//! Min-entropy assessment of noise source samples, following NIST SP 800-90B.
//!
//! ## Quick Start
//!
//! ```no_run
//! use minentropy_core::{AssessmentConfig, assess};
//!
//! let raw = std::fs::read("samples.bin").unwrap();
//! let report = assess(&raw, &AssessmentConfig::default()).unwrap();
//! println!("{report}");
//! ```
//!
//! ## Architecture
//!
//! Raw bytes → Sample Store → IID Tester → Estimator Suite → Combiner → Report
//!
//! Data that passes the permutation test runs the reduced IID suite (Most
//! Common Value and Collision). Everything else, including data the test could
//! not judge, runs all ten estimators. The final estimate is the minimum over
//! every candidate, so adding an estimator can only lower it.
//!
//! [`conditioning`] carries an assessed entropy through a conditioning
//! component to the entropy credited to its output.

pub mod assess;
pub mod combiner;
pub mod conditioning;
pub mod config;
pub mod error;
pub mod estimators;
pub mod iid;
pub mod numeric;
pub mod sample;
pub mod suffix;

pub use assess::{assess, assess_sequence, run_path};
pub use combiner::{Combiner, DecisionPath, FinalReport};
pub use conditioning::{ConditioningParams, ConditioningReport, Vetting};
pub use config::{AssessmentConfig, TestMode};
pub use error::{EngineError, Result};
pub use estimators::{CandidateEstimate, Estimate, EstimatorKind, EstimatorSettings, View};
pub use iid::{IidDecision, IidTester, IidVerdict, PermutationConfig};
pub use numeric::Bisection;
pub use sample::{
    MIN_SAMPLES, SampleEncoding, SampleOptions, SampleSequence, SampleStore, SizePolicy, Window,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
