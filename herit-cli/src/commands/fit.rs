//! Fit the animal model with an external sampler.
//!
//! herit fit --data-file growth.txt --treatment Control --sampler-program ./run_mcmc.sh --output-prefix run1

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use herit_core::model::serialization;
use herit_core::model::ModelSpec;
use herit_core::sampler::{fit_model, ExternalSampler};

use super::prepare::DataArgs;
use super::read_model_config;

#[derive(Args)]
pub struct FitArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Program that runs the sampler; receives the working directory as its last argument
    #[arg(long)]
    sampler_program: String,

    /// Extra argument passed to the sampler program (repeatable)
    #[arg(long = "sampler-arg", allow_hyphen_values = true)]
    sampler_args: Vec<String>,

    /// Model specification JSON; defaults to an intercept-only animal model
    #[arg(long)]
    model_config: Option<String>,

    /// Working directory for sampler inputs and outputs [default: <prefix>.work]
    #[arg(long)]
    work_dir: Option<String>,

    /// Output file prefix
    #[arg(long)]
    output_prefix: String,

    /// Also save JSON sidecar for debugging
    #[arg(long, default_value = "false")]
    save_json: bool,
}

/// Append `suffix` to the output prefix. The prefix may itself contain dots.
fn prefixed(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, suffix))
}

fn load_spec(args: &FitArgs) -> Result<ModelSpec> {
    match &args.model_config {
        Some(path) => read_model_config(path),
        None => Ok(ModelSpec::intercept_only(&args.data.trait_col)),
    }
}

pub fn run(args: FitArgs) -> Result<()> {
    info!("=== herit fit ===");
    let spec = load_spec(&args)?;
    info!("Model: {} | random {} | {:?}", spec.fixed, spec.random, spec.family);

    let (cohort, pedigree) = args.data.load_cohort()?;

    let work_dir = match &args.work_dir {
        Some(d) => PathBuf::from(d),
        None => prefixed(&args.output_prefix, "work"),
    };
    let sampler = ExternalSampler::new(&args.sampler_program, &work_dir)
        .with_args(args.sampler_args.iter().cloned());
    let posterior = fit_model(&sampler, &cohort, &pedigree, &spec)?;

    let posterior_path = prefixed(&args.output_prefix, "herit.posterior");
    serialization::save_posterior(&posterior, &posterior_path)?;
    info!("Posterior saved to {}", posterior_path.display());

    if args.save_json {
        let json_path = prefixed(&args.output_prefix, "herit.posterior.json");
        serialization::save_posterior_json(&posterior, &json_path)?;
        info!("JSON sidecar saved to {}", json_path.display());
    }

    println!("Posterior: {}", posterior_path.display());
    println!("Samples retained: {}", posterior.n_samples());
    println!("Location effects: {}", posterior.sol.names().join(", "));
    println!("Variance components: {}", posterior.vcv.names().join(", "));
    if let Some(dic) = posterior.dic {
        println!("DIC: {:.3}", dic);
    }
    Ok(())
}
