use minentropy_core::{ConditioningParams, EngineError, Vetting};

use super::CliError;

pub struct ConditioningCommandConfig<'a> {
    pub params: ConditioningParams,
    pub non_vetted: bool,
    pub h_prime: Option<f64>,
    /// JSON envelope written by `assess --output`; supplies h' when given.
    pub from_report: Option<&'a str>,
    pub format: &'a str,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: ConditioningCommandConfig<'_>) -> Result<(), CliError> {
    let vetting = if cfg.non_vetted {
        let h_prime = match (cfg.h_prime, cfg.from_report) {
            (Some(h), _) => h,
            (None, Some(path)) => h_prime_from_report(path)?,
            (None, None) => {
                return Err(EngineError::Conditioning(
                    "a non-vetted component needs --h-prime or --from-report".to_string(),
                )
                .into());
            }
        };
        Vetting::NonVetted { h_prime }
    } else {
        Vetting::Vetted
    };

    let report = cfg.params.assess(vetting)?;
    match cfg.format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!("{report}"),
    }

    if let Some(path) = cfg.output_path {
        super::write_json(path, &report)?;
        eprintln!("Result written to {path}");
    }
    Ok(())
}

/// Entropy per bit of a saved assessment: final estimate over sample width.
fn h_prime_from_report(path: &str) -> Result<f64, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Input {
        path: path.to_string(),
        source,
    })?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let report = &json["report"];
    match (
        report["finalEstimateBits"].as_f64(),
        report["bitsPerSample"].as_f64(),
    ) {
        (Some(h), Some(bits)) if bits > 0.0 => {
            log::info!("h' = {h} / {bits} from {path}");
            Ok(h / bits)
        }
        _ => Err(EngineError::Conditioning(format!(
            "{path} is not an assessment report"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_params() -> ConditioningParams {
        ConditioningParams {
            n_in: 512,
            n_out: 256,
            nw: 256,
            h_in: 400.0,
        }
    }

    fn config<'a>(out: &'a str) -> ConditioningCommandConfig<'a> {
        ConditioningCommandConfig {
            params: byte_params(),
            non_vetted: false,
            h_prime: None,
            from_report: None,
            format: "text",
            output_path: Some(out),
        }
    }

    fn read_json(path: &std::path::Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_vetted_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("conditioning.json");
        let out_path = out.to_string_lossy().into_owned();
        run(config(&out_path)).unwrap();

        let json = read_json(&out);
        assert_eq!(json["vetted"], true);
        assert_eq!(json["hOut"], 256.0);
        assert!(json["hPrime"].is_null());
    }

    #[test]
    fn test_h_prime_read_from_saved_report() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("report.json");
        std::fs::write(
            &saved,
            r#"{"report": {"finalEstimateBits": 6.0, "bitsPerSample": 8}}"#,
        )
        .unwrap();
        let saved_path = saved.to_string_lossy().into_owned();
        let out = dir.path().join("conditioning.json");
        let out_path = out.to_string_lossy().into_owned();

        run(ConditioningCommandConfig {
            non_vetted: true,
            from_report: Some(&saved_path),
            format: "json",
            ..config(&out_path)
        })
        .unwrap();

        let json = read_json(&out);
        assert_eq!(json["vetted"], false);
        assert_eq!(json["hPrime"], 0.75);
        assert_eq!(json["hOut"], 192.0);
    }

    #[test]
    fn test_non_vetted_needs_h_prime() {
        let err = run(ConditioningCommandConfig {
            non_vetted: true,
            output_path: None,
            ..config("unused.json")
        })
        .unwrap_err();
        assert!(matches!(err, CliError::Engine(EngineError::Conditioning(_))));
    }

    #[test]
    fn test_h_in_above_n_in_rejected() {
        let err = run(ConditioningCommandConfig {
            params: ConditioningParams {
                h_in: 600.0,
                ..byte_params()
            },
            output_path: None,
            ..config("unused.json")
        })
        .unwrap_err();
        assert!(err.to_string().contains("h_in"));
    }
}
