pub mod assess;
pub mod conditioning;
pub mod estimators;
pub mod iid;

use clap::Args;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use minentropy_core::{
    AssessmentConfig, EngineError, SampleEncoding, SizePolicy, TestMode, Window,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Where the samples come from and how to decode them.
#[derive(Args, Debug, Clone, Default)]
pub struct SampleArgs {
    /// Sample file (raw bytes)
    pub file: String,

    /// Bits per sample, 1 to 8 (default: 8, or the config file's value)
    #[arg(long)]
    pub bits: Option<u8>,

    /// One sample per byte in the low bits, instead of packed big-endian
    #[arg(long)]
    pub one_per_byte: bool,

    /// Keep only the first 1,000,000 samples
    #[arg(long)]
    pub truncate: bool,

    /// First sample of the assessed window
    #[arg(long, requires = "window_length")]
    pub window_start: Option<usize>,

    /// Samples in the assessed window
    #[arg(long, requires = "window_start")]
    pub window_length: Option<usize>,

    /// Accept fewer than 1,000,000 samples (results are not statistically valid)
    #[arg(long)]
    pub allow_insufficient: bool,

    /// JSON configuration file; flags given here override it
    #[arg(long)]
    pub config: Option<String>,
}

/// Permutation test overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct PermutationArgs {
    /// Number of shuffles (default: 10000)
    #[arg(long)]
    pub permutations: Option<usize>,

    /// Extreme ranks counted as rejection (default: 0)
    #[arg(long)]
    pub rank_tail: Option<usize>,

    /// Permutation RNG seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Start from `--config` (or defaults) and apply the flags on top.
pub fn build_config(
    samples: &SampleArgs,
    permutation: &PermutationArgs,
) -> Result<AssessmentConfig, CliError> {
    let mut config = match &samples.config {
        Some(path) => AssessmentConfig::from_json_path(path)?,
        None => AssessmentConfig::default(),
    };

    if let Some(bits) = samples.bits {
        config.samples.bits_per_sample = bits;
    }
    if samples.one_per_byte {
        config.samples.encoding = SampleEncoding::OnePerByte;
    }
    if samples.truncate {
        config.samples.truncate = true;
    }
    if let (Some(start), Some(length)) = (samples.window_start, samples.window_length) {
        config.samples.window = Some(Window { start, length });
    }
    if samples.allow_insufficient {
        config.samples.size_policy = SizePolicy::AllowInsufficient;
    }

    if let Some(n) = permutation.permutations {
        config.permutation.permutations = n;
    }
    if let Some(tail) = permutation.rank_tail {
        config.permutation.rank_tail = tail;
    }
    if permutation.seed.is_some() {
        config.permutation.seed = permutation.seed;
    }
    Ok(config)
}

/// Parse a test mode string into the enum.
pub fn parse_mode(s: &str) -> TestMode {
    match s {
        "non-iid" | "noniid" | "non_iid" => TestMode::NonIid,
        "iid" => TestMode::Iid,
        _ => {
            eprintln!("Unknown test mode '{s}', using iid");
            TestMode::Iid
        }
    }
}

pub fn read_samples(path: &str) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Input {
        path: path.to_string(),
        source,
    })
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// JSON wrapper tying a result to the exact input it came from.
#[derive(Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub uid: String,
    pub filename: &'a str,
    pub sha256: String,
    pub version: &'static str,
    pub report: &'a T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn new(filename: &'a str, raw: &[u8], report: &'a T) -> Self {
        Self {
            uid: uuid::Uuid::new_v4().to_string(),
            filename,
            sha256: sha256_hex(raw),
            version: minentropy_core::VERSION,
            report,
        }
    }
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), CliError> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// `warn` by default, `info` at -v, `debug` from -vv.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}
