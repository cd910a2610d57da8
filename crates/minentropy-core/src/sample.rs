//! Sample store: the immutable sample sequence every estimator reads.
//!
//! Raw bytes are decoded once into one `u8` per sample. Windowing and
//! truncation are applied once, up front, and produce a new sequence; the
//! estimators never see the untransformed input.
//!
//! ```text
//! raw bytes → decode (packed | one-per-byte) → window → truncate → length check
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Minimum sequence length for a statistically valid estimate.
pub const MIN_SAMPLES: usize = 1_000_000;

/// Number of bits kept in the bit view used for the bitstring assessment.
pub const DEFAULT_BITSTRING_LIMIT: usize = 1_000_000;

/// How samples are laid out in the raw byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// MSB-first bit stream cut into `bits_per_sample`-wide samples.
    /// A trailing partial sample is dropped.
    #[default]
    Packed,
    /// One sample per byte; only the low `bits_per_sample` bits are kept.
    OnePerByte,
}

/// Whether a short sequence is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizePolicy {
    /// Reject sequences shorter than [`MIN_SAMPLES`].
    #[default]
    Enforce,
    /// Development/testing mode: accept any non-empty sequence.
    AllowInsufficient,
}

/// Contiguous sub-sequence selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub length: usize,
}

/// Pre-processing options for [`SampleStore::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleOptions {
    pub bits_per_sample: u8,
    pub encoding: SampleEncoding,
    pub window: Option<Window>,
    /// Keep only the first [`MIN_SAMPLES`] samples.
    pub truncate: bool,
    pub size_policy: SizePolicy,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            bits_per_sample: 8,
            encoding: SampleEncoding::Packed,
            window: None,
            truncate: false,
            size_policy: SizePolicy::Enforce,
        }
    }
}

/// Ordered, immutable sequence of samples of a fixed width.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSequence {
    symbols: Vec<u8>,
    bits_per_sample: u8,
    histogram: [u64; 256],
    alphabet_size: usize,
}

fn validate_bits(bits: u8) -> Result<()> {
    if (1..=8).contains(&bits) {
        Ok(())
    } else {
        Err(EngineError::InvalidBitsPerSample { bits })
    }
}

fn mask(bits: u8) -> u8 {
    if bits >= 8 { 0xFF } else { (1u8 << bits) - 1 }
}

impl SampleSequence {
    /// Build a sequence from already-unpacked samples.
    ///
    /// Fails with [`EngineError::SymbolOutOfRange`] if any value needs more
    /// than `bits_per_sample` bits.
    pub fn from_symbols(symbols: Vec<u8>, bits_per_sample: u8) -> Result<Self> {
        validate_bits(bits_per_sample)?;
        let m = mask(bits_per_sample);
        if let Some((index, &value)) = symbols.iter().enumerate().find(|&(_, &s)| s & !m != 0) {
            return Err(EngineError::SymbolOutOfRange {
                index,
                value,
                bits: bits_per_sample,
            });
        }
        Ok(Self::from_trusted(symbols, bits_per_sample))
    }

    /// Decode a raw byte buffer.
    pub fn decode(raw: &[u8], bits_per_sample: u8, encoding: SampleEncoding) -> Result<Self> {
        validate_bits(bits_per_sample)?;
        let m = mask(bits_per_sample);
        let symbols = match encoding {
            SampleEncoding::OnePerByte => raw.iter().map(|&b| b & m).collect(),
            SampleEncoding::Packed => unpack(raw, bits_per_sample),
        };
        Ok(Self::from_trusted(symbols, bits_per_sample))
    }

    fn from_trusted(symbols: Vec<u8>, bits_per_sample: u8) -> Self {
        let mut histogram = [0u64; 256];
        for &s in &symbols {
            histogram[s as usize] += 1;
        }
        let alphabet_size = histogram.iter().filter(|&&c| c > 0).count();
        Self {
            symbols,
            bits_per_sample,
            histogram,
            alphabet_size,
        }
    }

    /// Contiguous sub-sequence `[start, start + length)`.
    pub fn window(&self, window: Window) -> Result<Self> {
        let available = self.len();
        let end = window
            .start
            .checked_add(window.length)
            .filter(|&end| end <= available)
            .ok_or(EngineError::WindowOutOfRange {
                start: window.start,
                length: window.length,
                available,
            })?;
        Ok(Self::from_trusted(
            self.symbols[window.start..end].to_vec(),
            self.bits_per_sample,
        ))
    }

    /// First `max_len` samples (the whole sequence if it is shorter).
    pub fn truncated(&self, max_len: usize) -> Self {
        if self.len() <= max_len {
            return self.clone();
        }
        Self::from_trusted(self.symbols[..max_len].to_vec(), self.bits_per_sample)
    }

    /// Enforce the minimum length according to `policy`.
    pub fn require_len(&self, policy: SizePolicy) -> Result<()> {
        let required = match policy {
            SizePolicy::Enforce => MIN_SAMPLES,
            SizePolicy::AllowInsufficient => 1,
        };
        if self.len() < required {
            return Err(EngineError::InsufficientSamples {
                required,
                actual: self.len(),
            });
        }
        Ok(())
    }

    /// Bit view: every sample expanded MSB-first into `bits_per_sample`
    /// one-bit samples, keeping at most `limit` bits.
    pub fn bitstring(&self, limit: Option<usize>) -> Self {
        let b = self.bits_per_sample;
        let cap = limit.unwrap_or(usize::MAX);
        let mut bits = Vec::with_capacity((self.len() * b as usize).min(cap));
        'outer: for &s in &self.symbols {
            for shift in (0..b).rev() {
                if bits.len() >= cap {
                    break 'outer;
                }
                bits.push((s >> shift) & 1);
            }
        }
        Self::from_trusted(bits, 1)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn bits_per_sample(&self) -> u8 {
        self.bits_per_sample
    }

    /// Size of the sample space, `2^b`.
    pub fn max_symbols(&self) -> usize {
        1usize << self.bits_per_sample
    }

    /// Occurrence count per symbol value.
    pub fn histogram(&self) -> &[u64; 256] {
        &self.histogram
    }

    /// Distinct observed values in ascending order.
    pub fn alphabet(&self) -> Vec<u8> {
        (0..=255u8)
            .filter(|&v| self.histogram[v as usize] > 0)
            .collect()
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// A single repeated symbol: zero entropy, no statistics needed.
    pub fn is_constant(&self) -> bool {
        self.alphabet_size == 1
    }

    /// Count of the most frequent symbol.
    pub fn mode_count(&self) -> u64 {
        self.histogram.iter().copied().max().unwrap_or(0)
    }

    pub fn is_binary(&self) -> bool {
        self.bits_per_sample == 1
    }

    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let total: u64 = self
            .histogram
            .iter()
            .enumerate()
            .map(|(v, &c)| v as u64 * c)
            .sum();
        total as f64 / self.len() as f64
    }

    /// Median of the sample values; 0.5 for binary data.
    pub fn median(&self) -> f64 {
        if self.is_binary() {
            return 0.5;
        }
        let n = self.len() as u64;
        if n == 0 {
            return 0.0;
        }
        // Walk the histogram instead of sorting a copy.
        let value_at = |rank: u64| -> f64 {
            let mut seen = 0u64;
            for (v, &c) in self.histogram.iter().enumerate() {
                seen += c;
                if seen > rank {
                    return v as f64;
                }
            }
            255.0
        };
        if n % 2 == 1 {
            value_at(n / 2)
        } else {
            (value_at(n / 2 - 1) + value_at(n / 2)) / 2.0
        }
    }
}

/// MSB-first bit-stream unpacking.
fn unpack(raw: &[u8], bits: u8) -> Vec<u8> {
    let b = bits as u32;
    let m = mask(bits) as u32;
    let mut out = Vec::with_capacity(raw.len() * 8 / b as usize);
    let mut acc: u32 = 0;
    let mut pending: u32 = 0;
    for &byte in raw {
        acc = (acc << 8) | byte as u32;
        pending += 8;
        while pending >= b {
            pending -= b;
            out.push(((acc >> pending) & m) as u8);
        }
        acc &= (1u32 << pending) - 1;
    }
    out
}

/// Builds the immutable sequence handed to the estimators.
pub struct SampleStore;

impl SampleStore {
    /// Decode `raw`, apply the optional window then truncation, and check the
    /// resulting length.
    pub fn load(raw: &[u8], options: &SampleOptions) -> Result<SampleSequence> {
        let mut seq = SampleSequence::decode(raw, options.bits_per_sample, options.encoding)?;
        if let Some(window) = options.window {
            seq = seq.window(window)?;
        }
        if options.truncate {
            seq = seq.truncated(MIN_SAMPLES);
        }
        seq.require_len(options.size_policy)?;
        if options.size_policy == SizePolicy::AllowInsufficient && seq.len() < MIN_SAMPLES {
            log::warn!(
                "assessing {} samples (< {MIN_SAMPLES}); estimates are not statistically valid",
                seq.len()
            );
        }
        log::debug!(
            "loaded {} samples, {} bits/sample, {} distinct values",
            seq.len(),
            seq.bits_per_sample(),
            seq.alphabet_size()
        );
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_options(bits: u8) -> SampleOptions {
        SampleOptions {
            bits_per_sample: bits,
            size_policy: SizePolicy::AllowInsufficient,
            ..SampleOptions::default()
        }
    }

    #[test]
    fn test_invalid_bits_rejected() {
        for bits in [0u8, 9, 200] {
            let err = SampleStore::load(&[1, 2, 3], &dev_options(bits)).unwrap_err();
            assert_eq!(err, EngineError::InvalidBitsPerSample { bits });
        }
    }

    #[test]
    fn test_unpack_msb_first() {
        let seq = SampleSequence::decode(&[0b1011_0001], 1, SampleEncoding::Packed).unwrap();
        assert_eq!(seq.symbols(), &[1, 0, 1, 1, 0, 0, 0, 1]);

        let seq = SampleSequence::decode(&[0b1011_0001], 4, SampleEncoding::Packed).unwrap();
        assert_eq!(seq.symbols(), &[0b1011, 0b0001]);

        // 3-bit samples across byte boundaries, trailing bit dropped.
        let seq = SampleSequence::decode(&[0b1010_0111, 0b0100_0000], 3, SampleEncoding::Packed)
            .unwrap();
        assert_eq!(seq.symbols(), &[0b101, 0b001, 0b110, 0b100, 0b000]);
    }

    #[test]
    fn test_one_per_byte_masks_high_bits() {
        let seq = SampleSequence::decode(&[0xFF, 0x02, 0x81], 2, SampleEncoding::OnePerByte)
            .unwrap();
        assert_eq!(seq.symbols(), &[3, 2, 1]);
    }

    #[test]
    fn test_from_symbols_checks_range() {
        let err = SampleSequence::from_symbols(vec![0, 1, 2], 1).unwrap_err();
        assert_eq!(
            err,
            EngineError::SymbolOutOfRange {
                index: 2,
                value: 2,
                bits: 1
            }
        );
        assert!(SampleSequence::from_symbols(vec![255, 0], 8).is_ok());
    }

    #[test]
    fn test_insufficient_samples_is_fatal_by_default() {
        let options = SampleOptions {
            bits_per_sample: 8,
            encoding: SampleEncoding::OnePerByte,
            ..SampleOptions::default()
        };
        let err = SampleStore::load(&[7u8; 1000], &options).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientSamples {
                required: MIN_SAMPLES,
                actual: 1000
            }
        );
    }

    #[test]
    fn test_allow_insufficient_still_rejects_empty() {
        let err = SampleStore::load(&[], &dev_options(8)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientSamples {
                required: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn test_window_identity() {
        let symbols: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 256) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 8).unwrap();
        let same = seq
            .window(Window {
                start: 0,
                length: seq.len(),
            })
            .unwrap();
        assert_eq!(same, seq);
    }

    #[test]
    fn test_window_selects_range() {
        let seq = SampleSequence::from_symbols((0..100u8).collect(), 8).unwrap();
        let w = seq.window(Window { start: 10, length: 5 }).unwrap();
        assert_eq!(w.symbols(), &[10, 11, 12, 13, 14]);
    }

    #[test]
    fn test_window_out_of_range() {
        let seq = SampleSequence::from_symbols(vec![0; 100], 8).unwrap();
        let err = seq.window(Window { start: 90, length: 11 }).unwrap_err();
        assert_eq!(
            err,
            EngineError::WindowOutOfRange {
                start: 90,
                length: 11,
                available: 100
            }
        );
        assert!(seq.window(Window { start: usize::MAX, length: 2 }).is_err());
    }

    #[test]
    fn test_truncation_idempotent_at_limit() {
        let symbols: Vec<u8> = (0..MIN_SAMPLES).map(|i| (i % 2) as u8).collect();
        let seq = SampleSequence::from_symbols(symbols, 1).unwrap();
        let t = seq.truncated(MIN_SAMPLES);
        assert_eq!(t, seq);
        assert_eq!(t.truncated(MIN_SAMPLES), t);
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let symbols: Vec<u8> = (0..MIN_SAMPLES + 10).map(|i| (i % 251) as u8).collect();
        let options = SampleOptions {
            bits_per_sample: 8,
            encoding: SampleEncoding::OnePerByte,
            truncate: true,
            ..SampleOptions::default()
        };
        let seq = SampleStore::load(&symbols, &options).unwrap();
        assert_eq!(seq.len(), MIN_SAMPLES);
        assert_eq!(seq.symbols(), &symbols[..MIN_SAMPLES]);
    }

    #[test]
    fn test_window_applied_before_truncation() {
        let raw: Vec<u8> = (0..200u8).collect();
        let options = SampleOptions {
            bits_per_sample: 8,
            encoding: SampleEncoding::OnePerByte,
            window: Some(Window { start: 50, length: 20 }),
            truncate: true,
            size_policy: SizePolicy::AllowInsufficient,
        };
        let seq = SampleStore::load(&raw, &options).unwrap();
        assert_eq!(seq.symbols(), &raw[50..70]);
    }

    #[test]
    fn test_alphabet_and_constant() {
        let seq = SampleSequence::from_symbols(vec![5, 5, 5, 5], 4).unwrap();
        assert!(seq.is_constant());
        assert_eq!(seq.alphabet(), vec![5]);
        assert_eq!(seq.mode_count(), 4);

        let seq = SampleSequence::from_symbols(vec![3, 1, 3, 2], 2).unwrap();
        assert!(!seq.is_constant());
        assert_eq!(seq.alphabet(), vec![1, 2, 3]);
        assert_eq!(seq.max_symbols(), 4);
    }

    #[test]
    fn test_bitstring_view() {
        let seq = SampleSequence::from_symbols(vec![0b101, 0b010], 3).unwrap();
        let bits = seq.bitstring(None);
        assert_eq!(bits.bits_per_sample(), 1);
        assert_eq!(bits.symbols(), &[1, 0, 1, 0, 1, 0]);
        assert_eq!(seq.bitstring(Some(4)).symbols(), &[1, 0, 1, 0]);
    }

    #[test]
    fn test_mean_and_median() {
        let seq = SampleSequence::from_symbols(vec![1, 2, 3, 10], 4).unwrap();
        assert!((seq.mean() - 4.0).abs() < 1e-12);
        assert!((seq.median() - 2.5).abs() < 1e-12);

        let seq = SampleSequence::from_symbols(vec![0, 1, 1], 1).unwrap();
        assert_eq!(seq.median(), 0.5);
    }
}
