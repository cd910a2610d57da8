//! Assess a synthetic biased source.
//!
//! Draws 4-bit samples where one value is favoured, then prints the full
//! report. The bias should pull the estimate well below 4 bits.
//!
//! Run: `cargo run --example synthetic`

use minentropy_core::{
    AssessmentConfig, SampleOptions, SampleSequence, SizePolicy, assess_sequence,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn main() {
    let mut rng = StdRng::seed_from_u64(2024);
    let symbols: Vec<u8> = (0..200_000)
        .map(|_| {
            if rng.random_bool(0.25) {
                0
            } else {
                rng.random_range(0..16u8)
            }
        })
        .collect();

    let seq = match SampleSequence::from_symbols(symbols, 4) {
        Ok(seq) => seq,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut config = AssessmentConfig {
        samples: SampleOptions {
            bits_per_sample: 4,
            size_policy: SizePolicy::AllowInsufficient,
            ..SampleOptions::default()
        },
        precision: Some(4),
        ..AssessmentConfig::default()
    };
    // A short permutation run keeps the example quick.
    config.permutation.permutations = 500;

    match assess_sequence(&seq, &config) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
