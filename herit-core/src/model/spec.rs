//! Model specification handed to the sampler.
//!
//! Intercept-only Gaussian animal model:
//!   y = mu + a + e,  a ~ N(0, V_A * A),  e ~ N(0, V_R * I)
//! where A is the additive relationship matrix implied by the pedigree.
//! Both variances get independent inverse-gamma style priors parameterized by
//! a variance anchor `v` and a belief parameter `nu`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Name of the additive genetic variance component.
pub const ADDITIVE_TERM: &str = "animal";
/// Name of the residual variance component.
pub const RESIDUAL_TERM: &str = "units";

/// Outcome distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Gaussian,
}

/// Weak prior for a single variance component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariancePrior {
    /// Variance anchor.
    pub v: f64,
    /// Degree of belief.
    pub nu: f64,
}

impl Default for VariancePrior {
    fn default() -> Self {
        Self { v: 1.0, nu: 0.002 }
    }
}

/// Priors for the residual (R) and random-effect (G) structures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorSpec {
    pub r: VariancePrior,
    /// One entry per random term, in formula order.
    pub g: Vec<VariancePrior>,
}

impl Default for PriorSpec {
    fn default() -> Self {
        Self {
            r: VariancePrior::default(),
            g: vec![VariancePrior::default()],
        }
    }
}

/// MCMC iteration schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct McmcSchedule {
    /// Total iterations, burn-in included.
    pub nitt: usize,
    pub burnin: usize,
    /// Keep every `thin`-th iteration after burn-in.
    pub thin: usize,
}

impl Default for McmcSchedule {
    fn default() -> Self {
        Self {
            nitt: 130_000,
            burnin: 30_000,
            thin: 100,
        }
    }
}

impl McmcSchedule {
    /// Number of retained samples this schedule produces.
    pub fn expected_samples(&self) -> usize {
        if self.thin == 0 || self.burnin >= self.nitt {
            return 0;
        }
        (self.nitt - self.burnin).div_ceil(self.thin)
    }
}

/// Full model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    /// Response column in the dataset.
    pub response: String,
    /// Fixed-effect formula.
    pub fixed: String,
    /// Random-effect formula; each term must be covered by the pedigree.
    pub random: String,
    pub family: Family,
    pub prior: PriorSpec,
    pub schedule: McmcSchedule,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::intercept_only("ApertureIndex")
    }
}

impl ModelSpec {
    /// `response ~ 1` with a single additive genetic term.
    pub fn intercept_only(response: &str) -> Self {
        Self {
            response: response.to_string(),
            fixed: format!("{} ~ 1", response),
            random: format!("~{}", ADDITIVE_TERM),
            family: Family::Gaussian,
            prior: PriorSpec::default(),
            schedule: McmcSchedule::default(),
        }
    }

    /// Random-effect terms named in the random formula.
    pub fn random_terms(&self) -> Vec<String> {
        self.random
            .trim()
            .trim_start_matches('~')
            .split('+')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.schedule;
        if s.thin == 0 {
            bail!("Thinning interval must be positive");
        }
        if s.burnin >= s.nitt {
            bail!(
                "Burn-in ({}) must be smaller than the iteration count ({})",
                s.burnin,
                s.nitt
            );
        }

        let lhs = self.fixed.split('~').next().unwrap_or("").trim();
        if !self.fixed.contains('~') || lhs != self.response {
            bail!(
                "Fixed formula '{}' must have '{}' on the left-hand side",
                self.fixed,
                self.response
            );
        }

        let terms = self.random_terms();
        if terms.is_empty() {
            bail!("Random formula '{}' names no terms", self.random);
        }
        if terms.len() != self.prior.g.len() {
            bail!(
                "{} random terms but {} G-structure priors",
                terms.len(),
                self.prior.g.len()
            );
        }

        for (name, p) in std::iter::once(("R", &self.prior.r))
            .chain(self.prior.g.iter().map(|p| ("G", p)))
        {
            if !(p.v.is_finite() && p.v > 0.0) {
                bail!("{} prior V must be positive, got {}", name, p.v);
            }
            if !(p.nu.is_finite() && p.nu >= 0.0) {
                bail!("{} prior nu must be non-negative, got {}", name, p.nu);
            }
        }
        Ok(())
    }
}
