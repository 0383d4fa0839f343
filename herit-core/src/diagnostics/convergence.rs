//! Per-parameter convergence checks against documented rules of thumb.
//!
//! Nothing here fails a run: a parameter below threshold is flagged and
//! logged, and the analyst decides whether to lengthen the schedule or
//! revisit the priors.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use herit_data::chains::ChainSet;

use super::autocorr::{autocorr_diag, DEFAULT_LAGS};
use super::geweke::{geweke, GewekeResult, DEFAULT_FIRST, DEFAULT_LAST};
use super::hpd::DEFAULT_PROB;
use super::spectrum::effective_size;

/// Acceptance heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceThresholds {
    /// Minimum effective sample size per monitored parameter.
    pub min_ess: f64,
    /// Geweke p-values at or below this are flagged.
    pub geweke_alpha: f64,
    pub geweke_first: f64,
    pub geweke_last: f64,
    /// Lags (in retained samples) at which autocorrelation is reported.
    pub lags: Vec<usize>,
    /// Credible mass for HPD intervals.
    pub hpd_prob: f64,
}

impl Default for ConvergenceThresholds {
    fn default() -> Self {
        Self {
            min_ess: 1000.0,
            geweke_alpha: 0.05,
            geweke_first: DEFAULT_FIRST,
            geweke_last: DEFAULT_LAST,
            lags: DEFAULT_LAGS.to_vec(),
            hpd_prob: DEFAULT_PROB,
        }
    }
}

/// Diagnostics for one parameter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDiagnostics {
    pub name: String,
    pub n_samples: usize,
    pub ess: f64,
    /// (lag, autocorrelation) pairs.
    pub autocorr: Vec<(usize, f64)>,
    pub geweke: Option<GewekeResult>,
}

impl ParameterDiagnostics {
    pub fn compute(name: &str, x: &[f64], thresholds: &ConvergenceThresholds) -> Self {
        Self {
            name: name.to_string(),
            n_samples: x.len(),
            ess: effective_size(x),
            autocorr: autocorr_diag(x, &thresholds.lags),
            geweke: geweke(x, thresholds.geweke_first, thresholds.geweke_last),
        }
    }

    pub fn ess_ok(&self, thresholds: &ConvergenceThresholds) -> bool {
        self.ess > thresholds.min_ess
    }

    /// `None` when the Geweke test could not be computed.
    pub fn geweke_ok(&self, thresholds: &ConvergenceThresholds) -> Option<bool> {
        self.geweke.map(|g| g.pvalue > thresholds.geweke_alpha)
    }

    /// Autocorrelation at `lag`, if reported.
    pub fn autocorr_at(&self, lag: usize) -> Option<f64> {
        self.autocorr.iter().find(|(k, _)| *k == lag).map(|(_, r)| *r)
    }
}

/// Diagnostics for every monitored parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceReport {
    pub thresholds: ConvergenceThresholds,
    pub parameters: Vec<ParameterDiagnostics>,
}

impl ConvergenceReport {
    /// Run the diagnostics over one or more chain collections.
    pub fn compute(sets: &[&ChainSet], thresholds: &ConvergenceThresholds) -> Self {
        let parameters = sets
            .iter()
            .flat_map(|set| set.iter())
            .map(|(name, x)| ParameterDiagnostics::compute(name, x, thresholds))
            .collect();
        Self {
            thresholds: thresholds.clone(),
            parameters,
        }
    }

    /// Add an already-derived chain (e.g. heritability).
    pub fn push(&mut self, name: &str, x: &[f64]) {
        self.parameters
            .push(ParameterDiagnostics::compute(name, x, &self.thresholds));
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDiagnostics> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// True when every parameter meets the ESS rule and every computable
    /// Geweke test passes.
    pub fn all_pass(&self) -> bool {
        self.parameters.iter().all(|p| {
            p.ess_ok(&self.thresholds) && p.geweke_ok(&self.thresholds).unwrap_or(true)
        })
    }

    /// Emit one warning per failed heuristic.
    pub fn log_warnings(&self) {
        let t = &self.thresholds;
        for p in &self.parameters {
            if !p.ess_ok(t) {
                warn!(
                    "{}: effective sample size {:.0} below {:.0}; consider a longer chain or more thinning",
                    p.name, p.ess, t.min_ess
                );
            }
            match (p.geweke_ok(t), p.geweke) {
                (Some(false), Some(g)) => warn!(
                    "{}: Geweke z = {:.3}, p = {:.4} <= {}; chain may not be stationary",
                    p.name, g.z, g.pvalue, t.geweke_alpha
                ),
                (None, _) => warn!("{}: Geweke test not computable", p.name),
                _ => {}
            }
        }
        if self.all_pass() {
            info!("All {} parameters pass convergence heuristics", self.parameters.len());
        }
    }

    /// Render as a fixed-width text table.
    pub fn render(&self) -> String {
        let t = &self.thresholds;
        let mut out = String::new();

        out.push_str("Autocorrelation\n");
        out.push_str(&format!("{:<16}", "parameter"));
        for lag in &t.lags {
            out.push_str(&format!("{:>10}", format!("lag {}", lag)));
        }
        out.push('\n');
        for p in &self.parameters {
            out.push_str(&format!("{:<16}", p.name));
            for &lag in &t.lags {
                match p.autocorr_at(lag) {
                    Some(r) => out.push_str(&format!("{:>10.4}", r)),
                    None => out.push_str(&format!("{:>10}", "-")),
                }
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "\nConvergence (ESS > {:.0}, Geweke p > {})\n",
            t.min_ess, t.geweke_alpha
        ));
        out.push_str(&format!(
            "{:<16}{:>10}{:>10}{:>10}{:>10}  {}\n",
            "parameter", "n", "ESS", "z", "p", "status"
        ));
        for p in &self.parameters {
            let (z, pv) = match p.geweke {
                Some(g) => (format!("{:.3}", g.z), format!("{:.4}", g.pvalue)),
                None => ("n/a".to_string(), "n/a".to_string()),
            };
            let status = match (p.ess_ok(t), p.geweke_ok(t)) {
                (true, Some(true)) => "ok",
                (true, None) => "ok (no Geweke)",
                (false, _) => "low ESS",
                (true, Some(false)) => "not stationary",
            };
            out.push_str(&format!(
                "{:<16}{:>10}{:>10.1}{:>10}{:>10}  {}\n",
                p.name, p.n_samples, p.ess, z, pv, status
            ));
        }
        out
    }
}
