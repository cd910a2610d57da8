use std::time::Instant;

use minentropy_core::FinalReport;

use super::{CliError, Envelope, PermutationArgs, SampleArgs};

pub struct AssessCommandConfig<'a> {
    pub samples: &'a SampleArgs,
    pub permutation: &'a PermutationArgs,
    pub mode: Option<&'a str>,
    pub bitstring: bool,
    pub precision: Option<u32>,
    pub workers: Option<usize>,
    pub format: &'a str,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: AssessCommandConfig<'_>) -> Result<(), CliError> {
    let mut config = super::build_config(cfg.samples, cfg.permutation)?;
    if let Some(mode) = cfg.mode {
        config.mode = super::parse_mode(mode);
    }
    if !cfg.bitstring {
        config.bitstring = false;
    }
    if cfg.precision.is_some() {
        config.precision = cfg.precision;
    }
    if cfg.workers.is_some() {
        config.workers = cfg.workers;
    }

    let raw = super::read_samples(&cfg.samples.file)?;
    let t0 = Instant::now();
    let report = minentropy_core::assess(&raw, &config)?;
    log::info!("assessment took {:.2}s", t0.elapsed().as_secs_f64());

    let envelope = Envelope::new(&cfg.samples.file, &raw, &report);
    match cfg.format {
        "json" => println!("{}", serde_json::to_string_pretty(&envelope)?),
        _ => print_text(&cfg.samples.file, &report),
    }

    if let Some(path) = cfg.output_path {
        super::write_json(path, &envelope)?;
        eprintln!("Report written to {path}");
    }
    Ok(())
}

fn print_text(filename: &str, report: &FinalReport) {
    println!("File: {filename}");
    println!("{report}");
}
