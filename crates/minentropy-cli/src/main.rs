//! CLI for minentropy: how many bits of min-entropy does each sample carry?

mod commands;

use clap::{Parser, Subcommand};

use commands::{PermutationArgs, SampleArgs};
use minentropy_core::ConditioningParams;

#[derive(Parser)]
#[command(name = "minentropy")]
#[command(about = "minentropy: NIST SP 800-90B min-entropy assessment of noise source samples")]
#[command(version = minentropy_core::VERSION)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a sample file: IID test, estimator suite, final min-entropy.
    Assess {
        #[command(flatten)]
        samples: SampleArgs,

        #[command(flatten)]
        permutation: PermutationArgs,

        /// Test mode: iid (permutation test first, default) or non-iid (full suite)
        #[arg(long, value_parser = ["iid", "non-iid"])]
        mode: Option<String>,

        /// Skip the bit-level reassessment of multi-bit samples
        #[arg(long)]
        no_bitstring: bool,

        /// Decimal places kept (rounded down) in reported estimates
        #[arg(long)]
        precision: Option<u32>,

        /// Estimators run at once (default: all)
        #[arg(long)]
        workers: Option<usize>,

        /// Output format on stdout
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the JSON report envelope to this path
        #[arg(long)]
        output: Option<String>,
    },

    /// Run only the IID permutation test and print the statistic table
    Iid {
        #[command(flatten)]
        samples: SampleArgs,

        #[command(flatten)]
        permutation: PermutationArgs,

        /// Output format on stdout
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the JSON verdict envelope to this path
        #[arg(long)]
        output: Option<String>,
    },

    /// Entropy credited to the output of a conditioning component
    Conditioning {
        /// Input bits per invocation
        n_in: u32,

        /// Output bits per invocation
        n_out: u32,

        /// Narrowest internal width of the component
        nw: u32,

        /// Min-entropy of one input, in bits
        h_in: f64,

        /// The component is not a vetted construction
        #[arg(long)]
        non_vetted: bool,

        /// Entropy per bit assessed on the conditioned output (non-vetted only)
        #[arg(long, requires = "non_vetted", conflicts_with = "from_report")]
        h_prime: Option<f64>,

        /// Take h' from a report saved by `assess --output`
        #[arg(long, requires = "non_vetted")]
        from_report: Option<String>,

        /// Output format on stdout
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the JSON result to this path
        #[arg(long)]
        output: Option<String>,
    },

    /// List the estimators each decision path runs
    Estimators,
}

fn main() {
    let cli = Cli::parse();
    commands::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Assess {
            samples,
            permutation,
            mode,
            no_bitstring,
            precision,
            workers,
            format,
            output,
        } => commands::assess::run(commands::assess::AssessCommandConfig {
            samples: &samples,
            permutation: &permutation,
            mode: mode.as_deref(),
            bitstring: !no_bitstring,
            precision,
            workers,
            format: &format,
            output_path: output.as_deref(),
        }),
        Commands::Iid {
            samples,
            permutation,
            format,
            output,
        } => commands::iid::run(&samples, &permutation, &format, output.as_deref()),
        Commands::Conditioning {
            n_in,
            n_out,
            nw,
            h_in,
            non_vetted,
            h_prime,
            from_report,
            format,
            output,
        } => commands::conditioning::run(commands::conditioning::ConditioningCommandConfig {
            params: ConditioningParams {
                n_in,
                n_out,
                nw,
                h_in,
            },
            non_vetted,
            h_prime,
            from_report: from_report.as_deref(),
            format: &format,
            output_path: output.as_deref(),
        }),
        Commands::Estimators => {
            commands::estimators::run();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
