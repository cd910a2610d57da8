//! Entropy left after a conditioning component.
//!
//! A conditioning component maps `n_in` input bits carrying `h_in` bits of
//! min-entropy to `n_out` output bits, through an internal state no narrower
//! than `nw` bits. The output entropy follows SP 800-90B §3.1.5.1.2: the most
//! likely input is spread against the remaining mass over `2^(n_in - n)`
//! preimages of each output, with `n = min(n_out, nw)`.
//!
//! Non-vetted components are additionally capped by `0.999 * n_out` and by
//! `h' * n_out`, where `h'` is the entropy per bit assessed on the
//! component's own output.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Share of `n_out` a non-vetted component can at most be credited with.
pub const NON_VETTED_CAP: f64 = 0.999;

/// Shape of a conditioning component and the entropy fed into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditioningParams {
    /// Input bits per invocation.
    pub n_in: u32,
    /// Output bits per invocation.
    pub n_out: u32,
    /// Narrowest internal width.
    pub nw: u32,
    /// Min-entropy of one input, in bits.
    pub h_in: f64,
}

/// Whether the component is one of the approved (vetted) constructions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Vetting {
    Vetted,
    NonVetted {
        /// Entropy per output bit assessed on conditioned output, in `[0, 1]`.
        h_prime: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditioningReport {
    pub vetted: bool,
    pub n_in: u32,
    pub n_out: u32,
    /// Internal width after clamping to `n_in`.
    pub nw: u32,
    pub h_in: f64,
    pub h_prime: Option<f64>,
    /// Output entropy before the non-vetted caps.
    pub output_entropy: f64,
    /// Min-entropy credited to one output, in bits.
    pub h_out: f64,
}

impl ConditioningParams {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(EngineError::Conditioning(msg.to_string()));
        if self.n_in == 0 {
            return fail("n_in must be a positive integer");
        }
        if self.n_out == 0 {
            return fail("n_out must be a positive integer");
        }
        if self.nw == 0 {
            return fail("nw must be a positive integer");
        }
        if !(self.h_in > 0.0 && self.h_in <= self.n_in as f64) {
            return fail("h_in must be positive and at most n_in");
        }
        Ok(())
    }

    /// Internal width; a state wider than the input adds nothing.
    pub fn effective_width(&self) -> u32 {
        self.nw.min(self.n_in)
    }

    /// Output entropy in `[0, n_out]`. Assumes validated parameters.
    pub fn output_entropy(&self) -> f64 {
        let n_in = self.n_in as f64;
        let n = self.n_out.min(self.effective_width()) as f64;
        let p_high = (-self.h_in).exp2();
        // 2^(n_in - n) * p_low, kept free of 2^n_in so wide inputs stay finite.
        let spread = (1.0 - p_high) / (1.0 - (-n_in).exp2()) * (-n).exp2();
        let psi = spread + p_high;
        let omega = spread * (1.0 + (2.0 * n * std::f64::consts::LN_2 * (n - n_in).exp2()).sqrt());
        (-psi.max(omega).log2()).clamp(0.0, self.n_out as f64)
    }

    /// Entropy credited to one output of this component.
    pub fn assess(&self, vetting: Vetting) -> Result<ConditioningReport> {
        self.validate()?;
        let output_entropy = self.output_entropy();
        let n_out = self.n_out as f64;
        let (h_out, h_prime) = match vetting {
            Vetting::Vetted => (output_entropy, None),
            Vetting::NonVetted { h_prime } => {
                if !(0.0..=1.0).contains(&h_prime) {
                    return Err(EngineError::Conditioning(
                        "h' must be between 0 and 1 inclusive".to_string(),
                    ));
                }
                let h_out = output_entropy
                    .min(NON_VETTED_CAP * n_out)
                    .min(h_prime * n_out);
                (h_out, Some(h_prime))
            }
        };
        debug!(
            "conditioning {} -> {} bits (nw {}): output entropy {output_entropy:.6}, h_out {h_out:.6}",
            self.n_in,
            self.n_out,
            self.effective_width()
        );
        Ok(ConditioningReport {
            vetted: h_prime.is_none(),
            n_in: self.n_in,
            n_out: self.n_out,
            nw: self.effective_width(),
            h_in: self.h_in,
            h_prime,
            output_entropy,
            h_out,
        })
    }
}

impl std::fmt::Display for ConditioningReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "n_in:  {}", self.n_in)?;
        writeln!(f, "n_out: {}", self.n_out)?;
        writeln!(f, "nw:    {}", self.nw)?;
        writeln!(f, "h_in:  {}", self.h_in)?;
        if let Some(h_prime) = self.h_prime {
            writeln!(f, "h':    {h_prime}")?;
        }
        let label = if self.vetted { "Vetted" } else { "Non-vetted" };
        write!(f, "\n({label}) h_out: {:.6}", self.h_out)
    }
}
