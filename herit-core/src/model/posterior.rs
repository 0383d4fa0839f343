//! Posterior: the sampler's output, used as input for diagnostics.
//!
//! Holds the retained samples for the location effects (`sol`) and the
//! variance components (`vcv`), the model they came from, and the DIC when the
//! sampler reports one. The chains are read-only once constructed.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use herit_data::chains::ChainSet;

use super::spec::{ModelSpec, ADDITIVE_TERM, RESIDUAL_TERM};

/// A fitted posterior, serialized to `.herit.posterior` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posterior {
    /// Magic bytes for validation.
    pub magic: [u8; 4],
    /// Version number for forward compatibility.
    pub version: u32,
    /// Model the samples were drawn under.
    pub spec: ModelSpec,
    /// Location (fixed) effect samples.
    pub sol: ChainSet,
    /// Variance component samples.
    pub vcv: ChainSet,
    /// Deviance information criterion, if supplied by the sampler.
    pub dic: Option<f64>,
    /// Number of dataset rows the model was fitted to.
    pub n_records: usize,
    /// Number of pedigree rows, founders included.
    pub n_pedigree: usize,
}

impl Posterior {
    /// Magic bytes: "HRTP" (HeRiTability Posterior).
    pub const MAGIC: [u8; 4] = [b'H', b'R', b'T', b'P'];
    /// Current format version.
    pub const VERSION: u32 = 1;

    /// Create a posterior, checking that both chain collections agree in
    /// length and that the additive and residual components exist.
    pub fn new(spec: ModelSpec, sol: ChainSet, vcv: ChainSet, dic: Option<f64>) -> Result<Self> {
        if !sol.is_empty() && sol.n_samples() != vcv.n_samples() {
            bail!(
                "Location chains have {} samples but variance chains have {}",
                sol.n_samples(),
                vcv.n_samples()
            );
        }
        for term in [ADDITIVE_TERM, RESIDUAL_TERM] {
            if vcv.get(term).is_none() {
                bail!(
                    "Variance component '{}' missing from sampler output (found {:?})",
                    term,
                    vcv.names()
                );
            }
        }
        if vcv.n_samples() == 0 {
            bail!("Sampler returned no samples");
        }

        Ok(Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            spec,
            sol,
            vcv,
            dic,
            n_records: 0,
            n_pedigree: 0,
        })
    }

    /// Record the size of the data the posterior was fitted to.
    pub fn with_data_sizes(mut self, n_records: usize, n_pedigree: usize) -> Self {
        self.n_records = n_records;
        self.n_pedigree = n_pedigree;
        self
    }

    pub fn n_samples(&self) -> usize {
        self.vcv.n_samples()
    }

    /// Samples of a named variance component.
    pub fn variance(&self, name: &str) -> Result<&[f64]> {
        self.vcv
            .get(name)
            .with_context(|| format!("No variance component named '{}'", name))
    }

    pub fn additive(&self) -> Result<&[f64]> {
        self.variance(ADDITIVE_TERM)
    }

    pub fn residual(&self) -> Result<&[f64]> {
        self.variance(RESIDUAL_TERM)
    }
}
