//! Integration tests for minentropy-core.
//!
//! These tests drive the full pipeline:
//! raw bytes → sample store → IID test → estimator suite → final report.

use minentropy_core::{
    AssessmentConfig, DecisionPath, IidDecision, SampleOptions, SampleSequence, SampleStore,
    SizePolicy, TestMode, Window, assess, assess_sequence, run_path,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn small_config(bits: u8) -> AssessmentConfig {
    let mut config = AssessmentConfig {
        samples: SampleOptions {
            bits_per_sample: bits,
            size_policy: SizePolicy::AllowInsufficient,
            ..SampleOptions::default()
        },
        ..AssessmentConfig::default()
    };
    config.permutation.permutations = 200;
    config.permutation.seed = Some(7);
    config
}

fn random_bits(n: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(0..2u8)).collect()
}

#[test]
fn uniform_bits_score_near_one_bit() {
    let seq = SampleSequence::from_symbols(random_bits(200_000, 1), 1).unwrap();
    let candidates = run_path(DecisionPath::Iid, &seq, &small_config(1)).unwrap();
    let mcv = candidates
        .iter()
        .find(|c| c.key() == "Most Common Value")
        .unwrap();
    let collision = candidates.iter().find(|c| c.key() == "Collision").unwrap();
    assert!(mcv.min_entropy >= 0.9, "MCV: {}", mcv.min_entropy);
    assert!(collision.min_entropy >= 0.75, "Collision: {}", collision.min_entropy);
    assert!(collision.min_entropy <= 1.0);
}

fn uniform_symbols(n: usize, bits: u8, seed: u64) -> SampleSequence {
    let mut rng = StdRng::seed_from_u64(seed);
    let symbols = (0..n)
        .map(|_| rng.random_range(0..=((1u16 << bits) - 1) as u8))
        .collect();
    SampleSequence::from_symbols(symbols, bits).unwrap()
}

fn mcv_and_collision(seq: &SampleSequence) -> (f64, f64) {
    let mut config = small_config(seq.bits_per_sample());
    config.bitstring = false;
    let candidates = run_path(DecisionPath::Iid, seq, &config).unwrap();
    let score = |key: &str| {
        candidates
            .iter()
            .find(|c| c.key() == key)
            .map(|c| c.min_entropy)
            .unwrap()
    };
    (score("Most Common Value"), score("Collision"))
}

#[test]
fn uniform_wide_samples_score_near_full_width() {
    // The collision bound's confidence term costs a fixed share of the width
    // at a given length, so it gets a band rather than b - 0.15.
    for (bits, collision_band) in [(2u8, 1.55..=1.95), (4, 3.15..=3.7)] {
        let seq = uniform_symbols(200_000, bits, 21 + bits as u64);
        let (mcv, collision) = mcv_and_collision(&seq);
        let b = bits as f64;
        assert!(mcv >= b - 0.15 && mcv <= b, "b = {bits}, MCV: {mcv}");
        assert!(
            collision_band.contains(&collision),
            "b = {bits}, Collision: {collision}"
        );
    }
}

#[test]
fn random_data_takes_iid_path() {
    // 1000 shuffles at rank tail 0 still reject a true IID source now and
    // then, so assess a few independent sources and keep the first accepted.
    let mut config = small_config(8);
    config.permutation.permutations = 1_000;
    config.bitstring = false;
    let report = (0..5u64)
        .map(|seed| {
            let mut rng = StdRng::seed_from_u64(30 + seed);
            let raw: Vec<u8> = (0..20_000).map(|_| rng.random()).collect();
            assess(&raw, &config).unwrap()
        })
        .find(|r| r.decision_path == DecisionPath::Iid)
        .expect("no random source took the IID path");

    let verdict = report.iid_verdict.as_ref().unwrap();
    assert_eq!(verdict.decision, IidDecision::Iid);
    let mut keys: Vec<&str> = report
        .per_estimator_estimates
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, ["Collision", "Most Common Value"]);
    assert!(report.final_estimate_bits > 0.0 && report.final_estimate_bits <= 8.0);
}

#[test]
fn alternating_bits_reach_non_iid_and_zero() {
    // 0101... packed eight to a byte.
    let raw = vec![0x55u8; 4_000];
    let report = assess(&raw, &small_config(1)).unwrap();

    let verdict = report.iid_verdict.as_ref().unwrap();
    assert_ne!(verdict.decision, IidDecision::Iid);
    assert_eq!(report.decision_path, DecisionPath::NonIid);
    assert_eq!(report.per_estimator_estimates.len(), 10);
    assert!(
        report.final_estimate_bits < 0.05,
        "alternating bits scored {}",
        report.final_estimate_bits
    );
}

#[test]
fn constant_bytes_are_zero_entropy() {
    let raw = vec![0xAAu8; 10_000];
    let report = assess(&raw, &small_config(8)).unwrap();
    assert_eq!(report.final_estimate_bits, 0.0);
    assert_eq!(report.decision_path, DecisionPath::NonIid);
    assert!(report.per_estimator_estimates.values().all(|&h| h == 0.0));
}

#[test]
fn short_input_rejected_unless_allowed() {
    let mut config = small_config(8);
    config.samples.size_policy = SizePolicy::Enforce;
    assert!(assess(&[1, 2, 3], &config).is_err());
    config.samples.size_policy = SizePolicy::AllowInsufficient;
    config.mode = TestMode::NonIid;
    assert!(assess(&[1, 2, 3, 4, 5, 6, 7, 8], &config).is_ok());
}

#[test]
fn full_window_and_repeat_truncation_change_nothing() {
    let mut rng = StdRng::seed_from_u64(2);
    let raw: Vec<u8> = (0..5_000).map(|_| rng.random()).collect();
    let base = small_config(8).samples;

    let plain = SampleStore::load(&raw, &base).unwrap();
    let windowed = SampleStore::load(
        &raw,
        &SampleOptions {
            window: Some(Window {
                start: 0,
                length: raw.len(),
            }),
            ..base.clone()
        },
    )
    .unwrap();
    assert_eq!(plain, windowed);

    let once = plain.truncated(1_000);
    assert_eq!(once.truncated(1_000), once);
}

#[test]
fn wide_samples_report_bitstring_candidates() {
    let mut rng = StdRng::seed_from_u64(3);
    let symbols: Vec<u8> = (0..20_000).map(|_| rng.random_range(0..16u8)).collect();
    let seq = SampleSequence::from_symbols(symbols, 4).unwrap();
    let mut config = small_config(4);
    config.mode = TestMode::NonIid;

    let report = assess_sequence(&seq, &config).unwrap();
    assert_eq!(report.per_estimator_estimates.len(), 20);
    assert!(report.per_estimator_estimates.contains_key("LZ78Y (bitstring)"));
    assert!(report.per_estimator_estimates.values().all(|&h| h <= 4.0));

    config.bitstring = false;
    let report = assess_sequence(&seq, &config).unwrap();
    assert_eq!(report.per_estimator_estimates.len(), 10);
}

#[test]
#[ignore] // Run with: cargo test -- --ignored
fn full_size_uniform_bits() {
    let seq = SampleSequence::from_symbols(random_bits(1_000_000, 4), 1).unwrap();
    let candidates = run_path(DecisionPath::Iid, &seq, &small_config(1)).unwrap();
    for candidate in &candidates {
        assert!(
            candidate.min_entropy >= 0.9,
            "{}: {}",
            candidate.key(),
            candidate.min_entropy
        );
    }
}

#[test]
#[ignore] // Run with: cargo test -- --ignored
fn full_size_random_bytes_default_config() {
    let mut rng = StdRng::seed_from_u64(5);
    let raw: Vec<u8> = (0..1_000_000).map(|_| rng.random()).collect();
    let mut config = AssessmentConfig::default();
    config.permutation.seed = Some(11);

    let report = assess(&raw, &config).unwrap();
    let verdict = report.iid_verdict.as_ref().unwrap();
    assert_ne!(verdict.decision, IidDecision::Inconclusive);
    assert!(
        report.final_estimate_bits > 5.0 && report.final_estimate_bits <= 8.0,
        "random bytes scored {}",
        report.final_estimate_bits
    );
}

#[test]
#[ignore] // Run with: cargo test -- --ignored
fn full_size_uniform_bytes() {
    let seq = uniform_symbols(1_000_000, 8, 29);
    let (mcv, collision) = mcv_and_collision(&seq);
    assert!(mcv >= 7.85 && mcv <= 8.0, "MCV: {mcv}");
    assert!((6.0..=6.8).contains(&collision), "Collision: {collision}");
}
