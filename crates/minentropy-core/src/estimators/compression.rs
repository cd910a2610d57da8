//! Compression estimate (Maurer universal statistic).

use super::Estimate;
use crate::error::Result;
use crate::numeric::{Bisection, Z_ALPHA, min_entropy};
use crate::sample::SampleSequence;

const NAME: &str = "Compression";

/// Dictionary (reference) block length.
pub const DICTIONARY_LEN: usize = 1000;

/// Below this `(1 − z)^(u−1)` no longer moves `G(z)`.
const UNDERFLOW: f64 = 1e-300;

/// Expected Maurer statistic for a sequence of length `len` whose first
/// `DICTIONARY_LEN` samples seed the dictionary.
struct MaurerModel {
    len: usize,
    test_len: f64,
    /// `log2(u)` for `u = 0..=len`.
    log2: Vec<f64>,
}

impl MaurerModel {
    fn new(len: usize) -> Self {
        let log2 = (0..=len)
            .map(|u| if u == 0 { 0.0 } else { (u as f64).log2() })
            .collect();
        Self {
            len,
            test_len: (len - DICTIONARY_LEN) as f64,
            log2,
        }
    }

    /// `G(z)`: mean of `log2` distances when the next match has probability `z`.
    fn g(&self, z: f64) -> f64 {
        let d = DICTIONARY_LEN;
        let one_minus = 1.0 - z;
        let mut head = 0.0;
        let mut tail_weighted = 0.0;
        let mut tail = 0.0;
        let mut power = 1.0;
        for u in 1..=self.len {
            if power < UNDERFLOW {
                break;
            }
            let term = self.log2[u] * power;
            if u <= d {
                head += term;
            } else {
                tail_weighted += (self.len - u) as f64 * term;
                tail += term;
            }
            power *= one_minus;
        }
        (z * z * (head * self.test_len + tail_weighted) + z * tail) / self.test_len
    }

    fn expected(&self, p: f64, k: usize) -> f64 {
        let q = (1.0 - p) / (k as f64 - 1.0);
        self.g(p) + (k as f64 - 1.0) * self.g(q)
    }
}

/// Binary input is read as non-overlapping blocks of this many bits.
pub const BINARY_BLOCK_BITS: u8 = 6;

/// Compression estimate in bits per sample.
///
/// For `b = 1` the bound's variance correction `c` would be negative, which
/// would push the lower bound above the mean. Binary data is therefore
/// assessed as 6-bit blocks and the result is divided by the block width.
pub fn estimate(seq: &SampleSequence, bisection: &Bisection) -> Result<Estimate> {
    if seq.bits_per_sample() > 1 {
        return maurer(seq.symbols(), seq.bits_per_sample(), bisection);
    }
    let width = BINARY_BLOCK_BITS as usize;
    let blocks: Vec<u8> = seq
        .symbols()
        .chunks_exact(width)
        .map(|block| block.iter().fold(0u8, |acc, &b| (acc << 1) | b))
        .collect();
    let per_block = maurer(&blocks, BINARY_BLOCK_BITS, bisection)?;
    Ok(Estimate {
        min_entropy: per_block.min_entropy / width as f64,
        ..per_block.with("block_bits", width as f64)
    })
}

/// Maurer statistic bound over `symbols` of width `bits`, per symbol.
fn maurer(symbols: &[u8], bits: u8, bisection: &Bisection) -> Result<Estimate> {
    let len = symbols.len();
    if len <= DICTIONARY_LEN {
        return Ok(Estimate::new(0.0));
    }
    let k = 1usize << bits;
    let bits = bits as f64;
    let model = MaurerModel::new(len);
    let v = model.test_len;

    let mut last = [0usize; 256];
    let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
    for (idx, &s) in symbols.iter().enumerate() {
        let i = idx + 1;
        if i > DICTIONARY_LEN {
            let prev = last[s as usize];
            let distance = if prev == 0 { i } else { i - prev };
            let x = model.log2[distance];
            sum += x;
            sum_sq += x * x;
        }
        last[s as usize] = i;
    }

    let mean = sum / v;
    let c = 0.7 - 0.8 / bits + (4.0 + 32.0 / bits) * v.powf(-3.0 / bits) / 15.0;
    let sigma = c.max(0.0) * (sum_sq / v - mean * mean).max(0.0).sqrt();
    let lower = mean - Z_ALPHA * sigma / v.sqrt();

    let base = Estimate::new(bits)
        .with("mean", mean)
        .with("sigma", sigma)
        .with("lower_bound", lower);

    if lower >= model.expected(1.0 / k as f64, k) {
        return Ok(base);
    }
    // The expected statistic falls to 0 as p → 1.
    if lower <= 0.0 {
        return Ok(Estimate {
            min_entropy: 0.0,
            ..base
        });
    }
    let p = bisection.solve_decreasing(NAME, 1.0 / k as f64, 1.0, lower, |p| {
        model.expected(p, k)
    })?;
    Ok(Estimate {
        min_entropy: min_entropy(p),
        ..base.with("p", p)
    })
}
