//! Model driver.
//!
//! The MCMC sampler itself is an external collaborator behind the `Sampler`
//! trait. `fit_model` validates the inputs, makes the single blocking call,
//! and checks the shape of what comes back. Poor mixing is not detected here;
//! that is the job of the diagnostics stage.

pub mod external;

use std::collections::HashSet;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use herit_data::tables::IndividualSummary;

use crate::model::{ModelSpec, Posterior};
use crate::pedigree::Pedigree;

pub use external::ExternalSampler;

/// A Bayesian mixed-model sampler.
///
/// Implementations receive the per-individual dataset, a complete pedigree
/// and the model specification, and return the retained posterior samples.
/// Static dispatch in tests; `Box<dyn Sampler>` at the CLI level.
pub trait Sampler {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Draw posterior samples. Blocks until the whole schedule has run.
    fn sample(
        &self,
        data: &[IndividualSummary],
        pedigree: &Pedigree,
        spec: &ModelSpec,
    ) -> Result<Posterior>;
}

/// Fit the animal model with the given sampler.
pub fn fit_model<S: Sampler + ?Sized>(
    sampler: &S,
    data: &[IndividualSummary],
    pedigree: &Pedigree,
    spec: &ModelSpec,
) -> Result<Posterior> {
    spec.validate().context("Invalid model specification")?;
    if data.is_empty() {
        bail!("No data rows to fit");
    }
    pedigree
        .validate()
        .context("Pedigree must be complete before sampling")?;
    let in_pedigree: HashSet<i64> = pedigree.rows().iter().map(|r| r.animal).collect();
    if let Some(missing) = data.iter().find(|d| !in_pedigree.contains(&d.animal)) {
        bail!("Individual {} has no pedigree row", missing.animal);
    }

    info!(
        "Running {} sampler: {} records, {} pedigree rows, nitt={} burnin={} thin={}",
        sampler.name(),
        data.len(),
        pedigree.len(),
        spec.schedule.nitt,
        spec.schedule.burnin,
        spec.schedule.thin
    );
    let start = Instant::now();
    let posterior = sampler
        .sample(data, pedigree, spec)
        .with_context(|| format!("{} sampler failed", sampler.name()))?;
    info!(
        "Sampler finished in {:.1}s with {} samples",
        start.elapsed().as_secs_f64(),
        posterior.n_samples()
    );

    let expected = spec.schedule.expected_samples();
    if posterior.n_samples() != expected {
        warn!(
            "Sampler returned {} samples, schedule implies {}",
            posterior.n_samples(),
            expected
        );
    }

    Ok(posterior.with_data_sizes(data.len(), pedigree.len()))
}
