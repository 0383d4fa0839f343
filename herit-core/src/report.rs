//! Posterior summary tables.

use serde::{Deserialize, Serialize};

use herit_data::chains::ChainSet;

use crate::diagnostics::hpd::{hpd_interval, posterior_mode, MODE_ADJUST};
use crate::diagnostics::spectrum::effective_size;
use crate::model::spec::RESIDUAL_TERM;
use crate::model::{McmcSchedule, Posterior};
use crate::util::math::mean;

/// Summary of one parameter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub name: String,
    pub post_mean: f64,
    pub hpd: Option<(f64, f64)>,
    pub ess: f64,
    /// Two-sided Bayesian p-value; only reported for location effects.
    pub pmcmc: Option<f64>,
}

impl ParameterSummary {
    pub fn compute(name: &str, x: &[f64], hpd_prob: f64, with_pmcmc: bool) -> Self {
        Self {
            name: name.to_string(),
            post_mean: mean(x),
            hpd: hpd_interval(x, hpd_prob),
            ess: effective_size(x),
            pmcmc: if with_pmcmc { pmcmc(x) } else { None },
        }
    }
}

/// Twice the smaller of the posterior mass above and below zero, floored at
/// `1 / n`. `None` for an empty chain.
pub fn pmcmc(x: &[f64]) -> Option<f64> {
    if x.is_empty() {
        return None;
    }
    let n = x.len() as f64;
    let above = x.iter().filter(|&&v| v > 0.0).count() as f64 / n;
    let below = x.iter().filter(|&&v| v < 0.0).count() as f64 / n;
    Some(2.0 * above.min(below).max(0.5 / n))
}

/// Posterior mode of every chain in a collection.
pub fn posterior_modes(chains: &ChainSet) -> Vec<(String, Option<f64>)> {
    chains
        .iter()
        .map(|(name, x)| (name.to_string(), posterior_mode(x, MODE_ADJUST)))
        .collect()
}

/// Formula and run length, known only when the model specification was
/// recorded alongside the chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHeader {
    pub fixed: String,
    pub random: String,
    pub schedule: McmcSchedule,
}

/// Full model summary: DIC, G- and R-structure variance components and
/// location effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub header: Option<ModelHeader>,
    pub n_samples: usize,
    pub n_records: usize,
    pub dic: Option<f64>,
    pub hpd_prob: f64,
    pub g_structure: Vec<ParameterSummary>,
    pub r_structure: Vec<ParameterSummary>,
    pub location: Vec<ParameterSummary>,
}

impl ModelSummary {
    pub fn from_posterior(posterior: &Posterior, hpd_prob: f64) -> Self {
        let random_terms = posterior.spec.random_terms();
        let mut summary = Self::partitioned(posterior, hpd_prob, |name| {
            random_terms.iter().any(|t| t == name)
        });
        summary.header = Some(ModelHeader {
            fixed: posterior.spec.fixed.clone(),
            random: posterior.spec.random.clone(),
            schedule: posterior.spec.schedule,
        });
        summary
    }

    /// Summary of chains read without a model specification. Every variance
    /// component other than `units` is reported under the G-structure.
    pub fn from_chains(posterior: &Posterior, hpd_prob: f64) -> Self {
        Self::partitioned(posterior, hpd_prob, |name| name != RESIDUAL_TERM)
    }

    fn partitioned(
        posterior: &Posterior,
        hpd_prob: f64,
        is_random: impl Fn(&str) -> bool,
    ) -> Self {
        let (g_structure, r_structure): (Vec<_>, Vec<_>) = posterior
            .vcv
            .iter()
            .map(|(name, x)| ParameterSummary::compute(name, x, hpd_prob, false))
            .partition(|p| is_random(p.name.as_str()));
        let location = posterior
            .sol
            .iter()
            .map(|(name, x)| ParameterSummary::compute(name, x, hpd_prob, true))
            .collect();

        Self {
            header: None,
            n_samples: posterior.n_samples(),
            n_records: posterior.n_records,
            dic: posterior.dic,
            hpd_prob,
            g_structure,
            r_structure,
            location,
        }
    }

    pub fn render(&self) -> String {
        let pct = format!("{:.0}%", self.hpd_prob * 100.0);
        let mut out = String::new();
        if let Some(h) = &self.header {
            out.push_str(&format!(
                " Iterations = {}:{}\n Thinning interval = {}\n",
                h.schedule.burnin + 1,
                h.schedule.nitt,
                h.schedule.thin
            ));
        }
        out.push_str(&format!(" Sample size = {}\n", self.n_samples));
        if self.n_records > 0 {
            out.push_str(&format!(" Records = {}\n", self.n_records));
        }
        if let Some(h) = &self.header {
            out.push_str(&format!(" Fixed: {}\n Random: {}\n", h.fixed, h.random));
        }
        match self.dic {
            Some(d) => out.push_str(&format!("\n DIC: {:.3}\n", d)),
            None => out.push_str("\n DIC: not reported\n"),
        }

        match &self.header {
            Some(h) => out.push_str(&format!("\n G-structure: {}\n", h.random)),
            None => out.push_str("\n G-structure:\n"),
        }
        render_table(&mut out, &self.g_structure, &pct, false);
        out.push_str("\n R-structure: ~units\n");
        render_table(&mut out, &self.r_structure, &pct, false);
        match &self.header {
            Some(h) => out.push_str(&format!("\n Location effects: {}\n", h.fixed)),
            None => out.push_str("\n Location effects:\n"),
        }
        render_table(&mut out, &self.location, &pct, true);
        out
    }
}

fn render_table(out: &mut String, rows: &[ParameterSummary], pct: &str, with_pmcmc: bool) {
    out.push_str(&format!(
        "{:<16}{:>12}{:>12}{:>12}{:>10}",
        "",
        "post.mean",
        format!("l-{} CI", pct),
        format!("u-{} CI", pct),
        "eff.samp"
    ));
    if with_pmcmc {
        out.push_str(&format!("{:>10}", "pMCMC"));
    }
    out.push('\n');
    for p in rows {
        let (lo, hi) = match p.hpd {
            Some((lo, hi)) => (format!("{:.4}", lo), format!("{:.4}", hi)),
            None => ("NA".to_string(), "NA".to_string()),
        };
        out.push_str(&format!(
            "{:<16}{:>12.4}{:>12}{:>12}{:>10.1}",
            p.name, p.post_mean, lo, hi, p.ess
        ));
        if let Some(pv) = p.pmcmc.filter(|_| with_pmcmc) {
            out.push_str(&format!("{:>10}", format_pmcmc(pv)));
        }
        out.push('\n');
    }
}

fn format_pmcmc(p: f64) -> String {
    if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{:.3}", p)
    }
}

/// Render posterior modes as `name  mode` lines.
pub fn render_modes(title: &str, modes: &[(String, Option<f64>)]) -> String {
    let mut out = format!("Posterior modes ({})\n", title);
    for (name, mode) in modes {
        match mode {
            Some(m) => out.push_str(&format!("  {:<16}{:>12.4}\n", name, m)),
            None => out.push_str(&format!("  {:<16}{:>12}\n", name, "NA")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelSpec;

    fn posterior() -> Posterior {
        let sol = ChainSet::new(vec![(
            "(Intercept)".into(),
            (0..100).map(|i| 5.0 + (i % 10) as f64 * 0.01).collect(),
        )])
        .unwrap();
        let vcv = ChainSet::new(vec![
            ("animal".into(), (0..100).map(|i| 0.5 + (i % 3) as f64 * 0.1).collect()),
            ("units".into(), (0..100).map(|i| 1.0 + (i % 4) as f64 * 0.1).collect()),
        ])
        .unwrap();
        Posterior::new(ModelSpec::default(), sol, vcv, Some(123.4)).unwrap()
    }

    #[test]
    fn test_pmcmc() {
        assert_eq!(pmcmc(&[1.0, 2.0, 3.0, 4.0]), Some(0.25));
        assert_eq!(pmcmc(&[1.0, -1.0, 2.0, -2.0]), Some(1.0));
        assert_eq!(pmcmc(&[1.0, 1.0, 1.0, -1.0]), Some(0.5));
        assert_eq!(pmcmc(&[]), None);
    }

    #[test]
    fn test_summary_partitions_structures() {
        let summary = ModelSummary::from_posterior(&posterior(), 0.95);
        assert_eq!(summary.g_structure.len(), 1);
        assert_eq!(summary.g_structure[0].name, "animal");
        assert_eq!(summary.r_structure[0].name, "units");
        assert_eq!(summary.location.len(), 1);
        assert!(summary.location[0].pmcmc.is_some());
        assert!(summary.g_structure[0].pmcmc.is_none());
        assert!((summary.location[0].post_mean - 5.045).abs() < 1e-9);
    }

    #[test]
    fn test_render_contains_dic() {
        let text = ModelSummary::from_posterior(&posterior(), 0.95).render();
        assert!(text.contains("DIC: 123.400"));
        assert!(text.contains("G-structure"));
        assert!(text.contains("pMCMC"));
        assert!(text.contains("Sample size = 100"));
        assert!(text.contains("Iterations = "));
        assert!(text.contains("Fixed: ApertureIndex ~ 1"));
    }

    #[test]
    fn test_chains_without_spec_omit_model_header() {
        let mut p = posterior();
        let extra = p.vcv.get("animal").unwrap().to_vec();
        let mut named: Vec<(String, Vec<f64>)> =
            p.vcv.iter().map(|(n, x)| (n.to_string(), x.to_vec())).collect();
        named.push(("dam".into(), extra));
        p.vcv = ChainSet::new(named).unwrap();

        let summary = ModelSummary::from_chains(&p, 0.95);
        assert!(summary.header.is_none());
        let g: Vec<&str> = summary.g_structure.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(g, vec!["animal", "dam"]);
        assert_eq!(summary.r_structure[0].name, "units");

        let text = summary.render();
        assert!(text.contains("Sample size = 100"));
        assert!(text.contains("DIC: 123.400"));
        assert!(!text.contains("Iterations"));
        assert!(!text.contains("Thinning"));
        assert!(!text.contains("Fixed:"));
        assert!(!text.contains("ApertureIndex ~ 1"));
    }

    #[test]
    fn test_modes() {
        let p = posterior();
        let modes = posterior_modes(&p.vcv);
        assert_eq!(modes.len(), 2);
        assert!(modes.iter().all(|(_, m)| m.is_some()));
        assert!(render_modes("VCV", &modes).contains("animal"));
    }
}
