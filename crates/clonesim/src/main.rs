use clap::{Parser, Subcommand};
use clonesim_core::analysis::DEFAULT_COMPARISON_CORRELATION;
use clonesim::export::write_outputs;
use clonesim::report::render;
use clonesim::runner::DEFAULT_TOP_PERCENT;
use clonesim::{Command, RunOptions, init_logging, run};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clonesim")]
#[command(about = "Monte Carlo simulator for multi-step clone-selection workflows")]
struct Args {
    /// CSV file with a Results column and optional criteria columns
    #[arg(short, long)]
    data: PathBuf,

    /// YAML run configuration (default: derived from the dataset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for results and logs (default: ~/.clonesim/)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Override the configured Monte Carlo repetitions
    #[arg(short, long)]
    repetitions: Option<usize>,

    /// Override the configured seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Top-X% used when no config file is given
    #[arg(long, default_value_t = DEFAULT_TOP_PERCENT)]
    top_percent: f64,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Sweep the correlation grid and assess the workflow
    Simulate,
    /// Vary one workflow parameter at a time around the baseline
    Sensitivity {
        /// Correlation held fixed while other parameters vary
        #[arg(short, long)]
        baseline_correlation: Option<f64>,
    },
    /// Compare the two-step and three-step forms of the workflow
    Compare {
        /// Correlation both workflows are simulated at
        #[arg(short = 'b', long, default_value_t = DEFAULT_COMPARISON_CORRELATION)]
        correlation: f64,
        /// Third-step keep (default: the workflow's own, or half of step 2)
        #[arg(long)]
        step3_keep: Option<usize>,
    },
    /// Report data quality and suggest run parameters
    Recommend,
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Simulate => Command::Simulate,
            CliCommand::Sensitivity {
                baseline_correlation,
            } => Command::Sensitivity {
                baseline_correlation,
            },
            CliCommand::Compare {
                correlation,
                step3_keep,
            } => Command::Compare {
                correlation: Some(correlation),
                step3_keep,
            },
            CliCommand::Recommend => Command::Recommend,
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".clonesim")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let output_dir = args.output_dir.unwrap_or_else(default_output_dir);

    init_logging(&output_dir, &args.log_level)?;

    let options = RunOptions {
        data: args.data,
        config: args.config,
        output_dir: output_dir.clone(),
        top_percent: args.top_percent,
        repetitions: args.repetitions,
        seed: args.seed,
    };
    let command = Command::from(args.command);
    tracing::info!(command = command.name(), data = %options.data.display(), "Starting run");

    let report = run(&options, command)?;
    print!("{}", render(&report));

    let written = write_outputs(&output_dir, &report)?;
    println!();
    for path in written {
        println!("Wrote {}", path.display());
    }

    tracing::info!("Run complete");
    Ok(())
}
