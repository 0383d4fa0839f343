//! Heritability as a derived posterior chain.
//!
//! h2 = V_a / (V_a + V_r), evaluated sample by sample so the result is itself
//! a posterior chain and gets the same summaries as any sampled parameter.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::diagnostics::hpd::{hpd_interval, posterior_mode, MODE_ADJUST};
use crate::diagnostics::spectrum::effective_size;
use crate::model::Posterior;
use crate::util::math::mean;

/// Elementwise `a / (a + r)`. A zero denominator yields NaN for that sample.
pub fn heritability_chain(additive: &[f64], residual: &[f64]) -> Result<Vec<f64>> {
    if additive.len() != residual.len() {
        bail!(
            "Variance chains differ in length: additive {} vs residual {}",
            additive.len(),
            residual.len()
        );
    }
    Ok(additive
        .iter()
        .zip(residual)
        .map(|(&a, &r)| {
            let total = a + r;
            if total == 0.0 {
                f64::NAN
            } else {
                a / total
            }
        })
        .collect())
}

/// Posterior summary of the heritability chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeritabilityEstimate {
    pub chain: Vec<f64>,
    pub mean: f64,
    pub mode: Option<f64>,
    pub hpd: Option<(f64, f64)>,
    pub hpd_prob: f64,
    pub ess: f64,
}

impl HeritabilityEstimate {
    pub fn from_chains(additive: &[f64], residual: &[f64], hpd_prob: f64) -> Result<Self> {
        let chain = heritability_chain(additive, residual)?;
        let valid: Vec<f64> = chain.iter().copied().filter(|v| v.is_finite()).collect();
        if valid.len() < chain.len() {
            info!(
                "{} of {} heritability samples undefined (zero total variance)",
                chain.len() - valid.len(),
                chain.len()
            );
        }

        let est = Self {
            mean: mean(&valid),
            mode: posterior_mode(&valid, MODE_ADJUST),
            hpd: hpd_interval(&valid, hpd_prob),
            hpd_prob,
            ess: effective_size(&valid),
            chain,
        };
        info!(
            "Heritability: mean {:.4}, ESS {:.1}, n = {}",
            est.mean,
            est.ess,
            est.chain.len()
        );
        Ok(est)
    }

    /// Use the posterior's `animal` and `units` chains.
    pub fn from_posterior(posterior: &Posterior, hpd_prob: f64) -> Result<Self> {
        Self::from_chains(posterior.additive()?, posterior.residual()?, hpd_prob)
    }

    /// Same, with explicitly named variance components.
    pub fn from_components(
        posterior: &Posterior,
        additive: &str,
        residual: &str,
        hpd_prob: f64,
    ) -> Result<Self> {
        Self::from_chains(
            posterior.variance(additive)?,
            posterior.variance(residual)?,
            hpd_prob,
        )
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Heritability (h2 = Va / (Va + Vr))\n");
        out.push_str(&format!("  posterior mean : {:.4}\n", self.mean));
        if let Some(m) = self.mode {
            out.push_str(&format!("  posterior mode : {:.4}\n", m));
        }
        match self.hpd {
            Some((lo, hi)) => out.push_str(&format!(
                "  {:.0}% HPD      : [{:.4}, {:.4}]\n",
                self.hpd_prob * 100.0,
                lo,
                hi
            )),
            None => out.push_str("  HPD            : n/a\n"),
        }
        out.push_str(&format!("  effective size : {:.1}\n", self.ess));
        out
    }
}
