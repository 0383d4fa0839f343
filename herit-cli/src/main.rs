//! herit: pedigree-based heritability estimation from growth measurements.
//!
//! CLI entry point using clap for argument parsing.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "herit",
    version,
    about = "herit: animal-model heritability from growth measurements",
    long_about = "Aggregates per-individual trait means, builds and completes a pedigree,\n\
                   drives an external Bayesian mixed-model sampler, and diagnoses its output."
)]
struct Cli {
    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate measurements and write the dataset and pedigree tables
    Prepare(commands::prepare::PrepareArgs),

    /// Prepare inputs, run the external sampler and save the posterior
    Fit(commands::fit::FitArgs),

    /// Convergence diagnostics, summaries and heritability for a posterior
    Diagnose(commands::diagnose::DiagnoseArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    tracing::info!("herit v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Prepare(args) => commands::prepare::run(args),
        Commands::Fit(args) => commands::fit::run(args),
        Commands::Diagnose(args) => commands::diagnose::run(args),
    }
}
