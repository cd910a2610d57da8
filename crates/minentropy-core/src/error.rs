//! Error taxonomy for the assessment engine.
//!
//! Input-validation failures surface while building the sample store and
//! abort the run. A bisection that fails to converge aborts the whole run as
//! well: dropping one estimator from the minimum could overstate entropy.
//! A constant input is not an error, it takes the zero-entropy path.

use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("bits per sample must be between 1 and 8, got {bits}")]
    InvalidBitsPerSample { bits: u8 },

    #[error("insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("window [{start}, {start}+{length}) exceeds the {available} available samples")]
    WindowOutOfRange {
        start: usize,
        length: usize,
        available: usize,
    },

    #[error("sample {value} at index {index} does not fit in {bits} bits")]
    SymbolOutOfRange { index: usize, value: u8, bits: u8 },

    /// Bisection in the collision or compression estimator exhausted its
    /// iteration budget without reaching the tolerance.
    #[error("{estimator}: bisection did not converge after {iterations} iterations (residual {residual:e})")]
    Convergence {
        estimator: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid conditioning parameters: {0}")]
    Conditioning(String),
}

impl EngineError {
    /// Whether this error stems from the caller's input rather than from a
    /// numeric failure inside an estimator.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Convergence { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let e = EngineError::InvalidBitsPerSample { bits: 9 };
        assert!(e.to_string().contains("got 9"));

        let e = EngineError::WindowOutOfRange {
            start: 10,
            length: 5,
            available: 12,
        };
        assert!(e.to_string().contains("12 available"));
    }

    #[test]
    fn test_convergence_is_not_input_error() {
        let e = EngineError::Convergence {
            estimator: "Collision",
            iterations: 3,
            residual: 0.5,
        };
        assert!(!e.is_input_error());
        assert!(EngineError::InsufficientSamples {
            required: 1_000_000,
            actual: 10
        }
        .is_input_error());
    }
}
