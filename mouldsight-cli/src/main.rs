//! MouldSight CLI - compare produced parts against their master sample.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod output;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "mouldsight")]
#[command(author, version, about = "Master-sample visual inspection for moulded parts", long_about = None)]
#[command(after_help = exit_codes::HELP)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Suppress human-readable output (exit code only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one part image against the master sample image
    Compare {
        /// Master sample image
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Image of the produced part
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        /// Minimum defect area in px² (overrides configuration)
        #[arg(long, value_name = "PX")]
        min_area: Option<u32>,

        /// JSON configuration file (defaults to MOULDSIGHT_* environment variables)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Record the reference as this master sample key in the result
        #[arg(long, value_name = "KEY")]
        sample_key: Option<String>,
    },

    /// Compare several part images against one master sample concurrently
    Batch {
        /// Master sample image
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Images of the produced parts
        #[arg(value_name = "CANDIDATE", required = true, num_args = 1..)]
        candidates: Vec<PathBuf>,

        /// Minimum defect area in px² (overrides configuration)
        #[arg(long, value_name = "PX")]
        min_area: Option<u32>,

        /// JSON configuration file (defaults to MOULDSIGHT_* environment variables)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Maximum comparisons running at once (defaults to CPU count)
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,

        /// Per-comparison timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },

    /// List the defect catalog or show one entry
    Catalog {
        /// Defect key, e.g. short_shot
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "mouldsight_core=info,mouldsight=info,warn",
        _ => "mouldsight_core=debug,mouldsight=debug,info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Compare {
            reference,
            candidate,
            min_area,
            config,
            sample_key,
        } => {
            commands::compare::execute(
                commands::compare::CompareArgs {
                    reference,
                    candidate,
                    min_area,
                    config,
                    sample_key,
                },
                cli.format,
                cli.quiet,
            )
            .await
        }
        Commands::Batch {
            reference,
            candidates,
            min_area,
            config,
            jobs,
            timeout_secs,
        } => {
            commands::batch::execute(
                commands::batch::BatchArgs {
                    reference,
                    candidates,
                    min_area,
                    config,
                    jobs,
                    timeout_secs,
                },
                cli.format,
                cli.quiet,
            )
            .await
        }
        Commands::Catalog { name } => commands::catalog::execute(name, cli.format, cli.quiet),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let quiet = cli.quiet;

    let exit = run(cli).await.unwrap_or_else(|e| ExitCode::from_anyhow(&e));

    if exit.code != exit_codes::SUCCESS && exit.code != exit_codes::DEFECTS_FOUND {
        if let Some(message) = &exit.message {
            if !quiet {
                eprintln!("{} {}", "Error:".red().bold(), message);
            }
        }
    }

    std::process::exit(exit.code);
}
