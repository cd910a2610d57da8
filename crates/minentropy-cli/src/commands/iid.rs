use minentropy_core::{IidTester, IidVerdict, SampleStore};

use super::{CliError, Envelope, PermutationArgs, SampleArgs};

pub fn run(
    samples: &SampleArgs,
    permutation: &PermutationArgs,
    format: &str,
    output_path: Option<&str>,
) -> Result<(), CliError> {
    let config = super::build_config(samples, permutation)?;
    config.validate()?;

    let raw = super::read_samples(&samples.file)?;
    let seq = SampleStore::load(&raw, &config.samples)?;
    let verdict = IidTester::new(config.permutation.clone()).test(&seq);

    let envelope = Envelope::new(&samples.file, &raw, &verdict);
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&envelope)?),
        _ => {
            println!(
                "File: {} ({} samples x {} bits)\n",
                samples.file,
                seq.len(),
                seq.bits_per_sample()
            );
            print_verdict(&verdict);
        }
    }

    if let Some(path) = output_path {
        super::write_json(path, &envelope)?;
        eprintln!("Verdict written to {path}");
    }
    Ok(())
}

fn print_verdict(verdict: &IidVerdict) {
    if let Some(reason) = &verdict.reason {
        println!("IID test inconclusive: {reason}");
        return;
    }

    println!(
        "  {:<28} {:>14} {:>9} {:>9} {:>6}",
        "Statistic", "Original", "Greater", "Equal", "Pass"
    );
    println!("  {}", "─".repeat(70));
    for s in &verdict.statistics {
        println!(
            "  {:<28} {:>14.4} {:>9} {:>9} {:>6}",
            s.name,
            s.tally.original,
            s.tally.greater,
            s.tally.equal,
            if s.passed { "yes" } else { "NO" }
        );
    }
    println!("  {}", "─".repeat(70));

    if let Some(chi) = &verdict.chi_square {
        for (label, check) in [
            ("Chi-square independence", &chi.independence),
            ("Chi-square goodness of fit", &chi.goodness_of_fit),
        ] {
            println!(
                "  {:<28} score {:.2}, df {}, cutoff {:.2}: {}",
                label,
                check.score,
                check.degrees_of_freedom,
                check.cutoff,
                if check.passed { "pass" } else { "FAIL" }
            );
        }
    }
    if let Some(lrs) = &verdict.lrs {
        println!(
            "  {:<28} W = {}, P = {:.4}: {}",
            "Longest repeat",
            lrs.longest_repeat,
            lrs.probability,
            if lrs.passed { "pass" } else { "FAIL" }
        );
    }
    println!(
        "\n  Decision: {} ({} permutations)",
        verdict.decision, verdict.permutations_run
    );
}
