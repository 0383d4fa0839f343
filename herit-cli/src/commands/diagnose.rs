//! Convergence diagnostics, posterior summaries and heritability.
//!
//! herit diagnose --posterior-file run1.herit.posterior --plot-dir plots
//! herit diagnose --sol-file sol.csv --vcv-file vcv.csv --model-config model.json

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use herit_core::diagnostics::autocorr::autocorr_matrix;
use herit_core::diagnostics::{ConvergenceReport, ConvergenceThresholds};
use herit_core::heritability::HeritabilityEstimate;
use herit_core::model::serialization::load_posterior;
use herit_core::model::spec::{ADDITIVE_TERM, RESIDUAL_TERM};
use herit_core::model::{ModelSpec, Posterior};
use herit_core::plot::{plot_chains, plot_trace_density};
use herit_core::report::{posterior_modes, render_modes, ModelSummary};
use herit_data::chains::{read_chains, ChainSet};

use super::read_model_config;

#[derive(Args)]
pub struct DiagnoseArgs {
    /// Posterior file from `herit fit` (.herit.posterior)
    #[arg(long, conflicts_with_all = ["sol_file", "vcv_file"])]
    posterior_file: Option<String>,

    /// Location-effect chains (CSV, one column per effect)
    #[arg(long, requires = "vcv_file")]
    sol_file: Option<String>,

    /// Variance-component chains (CSV, one column per component)
    #[arg(long, requires = "sol_file")]
    vcv_file: Option<String>,

    /// Optional DIC when reading raw chain files
    #[arg(long)]
    dic: Option<f64>,

    /// Model specification JSON the raw chains were sampled under
    #[arg(long, conflicts_with = "posterior_file")]
    model_config: Option<String>,

    /// Directory for trace/density SVG plots
    #[arg(long)]
    plot_dir: Option<String>,

    /// Additive genetic variance component
    #[arg(long, default_value = "animal")]
    additive: String,

    /// Residual variance component
    #[arg(long, default_value = "units")]
    residual: String,

    /// Minimum acceptable effective sample size
    #[arg(long, default_value = "1000")]
    min_ess: f64,

    /// Geweke p-values at or below this are flagged
    #[arg(long, default_value = "0.05")]
    geweke_alpha: f64,

    /// Autocorrelation lags (comma-separated)
    #[arg(long, default_value = "0,1,5,10,50")]
    lags: String,

    /// Credible mass for HPD intervals
    #[arg(long, default_value = "0.95")]
    hpd_prob: f64,

    /// Lag for the cross-parameter autocorrelation matrices
    #[arg(long, default_value = "1")]
    matrix_lag: usize,
}

impl DiagnoseArgs {
    fn thresholds(&self) -> Result<ConvergenceThresholds> {
        let lags = self
            .lags
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("Invalid lag '{}'", s))
            })
            .collect::<Result<Vec<_>>>()?;
        if !(0.0..=1.0).contains(&self.hpd_prob) {
            bail!("--hpd-prob must lie in [0, 1], got {}", self.hpd_prob);
        }
        Ok(ConvergenceThresholds {
            min_ess: self.min_ess,
            geweke_alpha: self.geweke_alpha,
            lags,
            hpd_prob: self.hpd_prob,
            ..ConvergenceThresholds::default()
        })
    }

    /// Load the posterior and name the components heritability is built from.
    fn load(&self) -> Result<Loaded> {
        match (&self.posterior_file, &self.sol_file, &self.vcv_file) {
            (Some(p), _, _) => Ok(Loaded {
                posterior: load_posterior(Path::new(p))?,
                additive: self.additive.clone(),
                residual: self.residual.clone(),
                spec_known: true,
            }),
            (None, Some(sol), Some(vcv)) => {
                let spec = self.model_config.as_deref().map(read_model_config).transpose()?;
                let spec_known = spec.is_some();
                let sol = read_chains(Path::new(sol))?;
                let vcv = read_chains(Path::new(vcv))?;
                let posterior = chains_to_posterior(
                    spec.unwrap_or_default(),
                    sol,
                    vcv,
                    self.dic,
                    &self.additive,
                    &self.residual,
                )?;
                Ok(Loaded {
                    posterior,
                    additive: ADDITIVE_TERM.to_string(),
                    residual: RESIDUAL_TERM.to_string(),
                    spec_known,
                })
            }
            _ => bail!("Provide --posterior-file, or both --sol-file and --vcv-file"),
        }
    }
}

struct Loaded {
    posterior: Posterior,
    additive: String,
    residual: String,
    /// False for raw chains read without `--model-config`.
    spec_known: bool,
}

impl Loaded {
    fn summary(&self, hpd_prob: f64) -> ModelSummary {
        if self.spec_known {
            ModelSummary::from_posterior(&self.posterior, hpd_prob)
        } else {
            ModelSummary::from_chains(&self.posterior, hpd_prob)
        }
    }
}

/// Wrap raw chain files, renaming the chosen additive and residual
/// components to `animal` and `units`.
fn chains_to_posterior(
    spec: ModelSpec,
    sol: ChainSet,
    vcv: ChainSet,
    dic: Option<f64>,
    additive: &str,
    residual: &str,
) -> Result<Posterior> {
    for name in [additive, residual] {
        if vcv.get(name).is_none() {
            bail!("Variance component '{}' not found (have {:?})", name, vcv.names());
        }
    }
    let renamed = vcv
        .iter()
        .map(|(name, x)| {
            let name = if name == additive {
                ADDITIVE_TERM
            } else if name == residual {
                RESIDUAL_TERM
            } else {
                name
            };
            (name.to_string(), x.to_vec())
        })
        .collect();
    Posterior::new(spec, sol, ChainSet::new(renamed)?, dic)
}

fn print_matrix(title: &str, chains: &ChainSet, lag: usize) {
    if chains.is_empty() {
        return;
    }
    let m = autocorr_matrix(chains, lag);
    println!("{} autocorrelation, lag {}", title, lag);
    print!("{:<16}", "");
    for name in chains.names() {
        print!("{:>14}", name);
    }
    println!();
    for (name, row) in chains.names().iter().zip(&m) {
        print!("{:<16}", name);
        for v in row {
            print!("{:>14.4}", v);
        }
        println!();
    }
    println!();
}

pub fn run(args: DiagnoseArgs) -> Result<()> {
    info!("=== herit diagnose ===");
    let thresholds = args.thresholds()?;
    let loaded = args.load()?;
    let posterior = &loaded.posterior;
    info!(
        "{} samples, {} location effects, {} variance components",
        posterior.n_samples(),
        posterior.sol.n_params(),
        posterior.vcv.n_params()
    );

    let h2 = HeritabilityEstimate::from_components(
        posterior,
        &loaded.additive,
        &loaded.residual,
        thresholds.hpd_prob,
    )?;

    if let Some(dir) = &args.plot_dir {
        let dir = Path::new(dir);
        plot_chains(&posterior.sol, dir, "sol")?;
        plot_chains(&posterior.vcv, dir, "vcv")?;
        plot_trace_density("h2", &h2.chain, &dir.join("heritability.svg"))?;
    }

    print_matrix("Location", &posterior.sol, args.matrix_lag);
    print_matrix("Variance", &posterior.vcv, args.matrix_lag);

    let mut report = ConvergenceReport::compute(&[&posterior.sol, &posterior.vcv], &thresholds);
    report.push("h2", &h2.chain);
    report.log_warnings();
    println!("{}", report.render());

    println!("{}", render_modes("Sol", &posterior_modes(&posterior.sol)));
    println!("{}", render_modes("VCV", &posterior_modes(&posterior.vcv)));

    println!("{}", loaded.summary(thresholds.hpd_prob).render());
    println!("{}", h2.render());

    if !report.all_pass() {
        println!("Some parameters fail the convergence heuristics; see warnings above.");
    }
    Ok(())
}
