//! herit-core: Statistical pipeline for herit
//!
//! Implements trait aggregation, pedigree construction and completion,
//! model configuration and the sampler boundary, MCMC diagnostics
//! (autocorrelation, effective sample size, Geweke, HPD, modes),
//! heritability derivation, summaries and plots.

pub mod aggregate;
pub mod diagnostics;
pub mod heritability;
pub mod model;
pub mod pedigree;
pub mod plot;
pub mod report;
pub mod sampler;
pub mod util;
