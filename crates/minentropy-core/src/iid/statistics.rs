//! The nineteen permutation-test statistics.
//!
//! Every statistic is a pure function of a sample slice. Binary data is
//! first folded into 8-bit blocks, so the run, periodicity and covariance
//! statistics see block popcounts (Conversion I) and the collision
//! statistics see block values (Conversion II).

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::estimators::collision::collision_distances;

pub const STATISTIC_COUNT: usize = 19;

pub const STATISTIC_NAMES: [&str; STATISTIC_COUNT] = [
    "excursion",
    "numDirectionalRuns",
    "lenDirectionalRuns",
    "numIncreasesDecreases",
    "numRunsMedian",
    "lenRunsMedian",
    "avgCollision",
    "maxCollision",
    "periodicity(1)",
    "periodicity(2)",
    "periodicity(8)",
    "periodicity(16)",
    "periodicity(32)",
    "covariance(1)",
    "covariance(2)",
    "covariance(8)",
    "covariance(16)",
    "covariance(32)",
    "compression",
];

const LAGS: [usize; 5] = [1, 2, 8, 16, 32];

/// Permutation-invariant inputs, computed once from the original sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticContext {
    pub mean: f64,
    pub median: f64,
    pub binary: bool,
}

/// Conversion I: popcount of each full 8-bit block.
pub fn conversion_one(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|block| block.iter().sum())
        .collect()
}

/// Conversion II: each full 8-bit block read MSB-first as a byte.
pub fn conversion_two(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|block| block.iter().fold(0u8, |acc, &b| (acc << 1) | b))
        .collect()
}

/// Largest absolute deviation of the running sum from its expectation.
pub fn excursion(data: &[u8], mean: f64) -> f64 {
    let mut running = 0.0;
    let mut max = 0.0f64;
    for (i, &x) in data.iter().enumerate() {
        running += x as f64;
        max = max.max((running - (i + 1) as f64 * mean).abs());
    }
    max
}

/// Number of runs and longest run of a sign sequence.
fn runs<I: Iterator<Item = bool>>(mut signs: I) -> (f64, f64) {
    let Some(mut prev) = signs.next() else {
        return (0.0, 0.0);
    };
    let (mut count, mut run, mut longest) = (1usize, 1usize, 1usize);
    for s in signs {
        if s == prev {
            run += 1;
        } else {
            count += 1;
            run = 1;
            prev = s;
        }
        longest = longest.max(run);
    }
    (count as f64, longest as f64)
}

/// `(number of directional runs, longest directional run, max(#up, #down))`.
pub fn directional(data: &[u8]) -> (f64, f64, f64) {
    let (count, longest) = runs(data.windows(2).map(|w| w[0] <= w[1]));
    let steps = data.len().saturating_sub(1);
    let up = data.windows(2).filter(|w| w[0] <= w[1]).count();
    (count, longest, up.max(steps - up) as f64)
}

/// `(number of runs, longest run)` above/below the median.
pub fn median_runs(data: &[u8], median: f64) -> (f64, f64) {
    runs(data.iter().map(|&x| x as f64 >= median))
}

/// `(mean, max)` collision distance; NaN when the data has no collision.
pub fn collisions(data: &[u8]) -> (f64, f64) {
    let distances = collision_distances(data);
    if distances.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let sum: u64 = distances.iter().map(|&d| d as u64).sum();
    let max = distances.iter().copied().max().unwrap_or(0);
    (sum as f64 / distances.len() as f64, max as f64)
}

pub fn periodicity(data: &[u8], lag: usize) -> f64 {
    data.iter()
        .zip(data.iter().skip(lag))
        .filter(|(a, b)| a == b)
        .count() as f64
}

pub fn covariance(data: &[u8], lag: usize) -> f64 {
    data.iter()
        .zip(data.iter().skip(lag))
        .map(|(&a, &b)| a as u64 * b as u64)
        .sum::<u64>() as f64
}

/// zlib-compressed length of the raw samples; NaN if the encoder fails.
pub fn compressed_len(data: &[u8]) -> f64 {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    match encoder.write_all(data).and_then(|_| encoder.finish()) {
        Ok(out) => out.len() as f64,
        Err(_) => f64::NAN,
    }
}

/// Compute all nineteen statistics in [`STATISTIC_NAMES`] order.
pub fn compute(data: &[u8], ctx: &StatisticContext) -> [f64; STATISTIC_COUNT] {
    let popcounts;
    let blocks;
    let (runs_view, collision_view): (&[u8], &[u8]) = if ctx.binary {
        popcounts = conversion_one(data);
        blocks = conversion_two(data);
        (&popcounts, &blocks)
    } else {
        (data, data)
    };

    let mut out = [0.0; STATISTIC_COUNT];
    out[0] = excursion(data, ctx.mean);
    (out[1], out[2], out[3]) = directional(runs_view);
    (out[4], out[5]) = median_runs(data, ctx.median);
    (out[6], out[7]) = collisions(collision_view);
    for (i, &lag) in LAGS.iter().enumerate() {
        out[8 + i] = periodicity(runs_view, lag);
        out[13 + i] = covariance(runs_view, lag);
    }
    out[18] = compressed_len(data);
    out
}
