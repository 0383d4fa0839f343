//! Spectral density at frequency zero and effective sample size.
//!
//! The long-run variance of a chain is estimated from an autoregressive fit:
//!   S(0) = sigma^2 / (1 - sum_k phi_k)^2
//! with the AR order chosen by AIC and coefficients from the Yule-Walker
//! equations (Levinson-Durbin recursion).
//!
//! ESS = n * var(x) / S(0).

use crate::util::math::{mean, sample_variance};

/// Fitted AR model.
#[derive(Debug, Clone, PartialEq)]
pub struct ArFit {
    /// AR coefficients phi_1..phi_p.
    pub coefficients: Vec<f64>,
    /// Innovation variance, corrected for degrees of freedom.
    pub var_pred: f64,
}

impl ArFit {
    pub fn order(&self) -> usize {
        self.coefficients.len()
    }
}

/// Biased (1/n) autocovariances of a demeaned chain for lags 0..=max_lag.
pub fn autocovariances(x: &[f64], max_lag: usize) -> Vec<f64> {
    let n = x.len();
    let m = mean(x);
    (0..=max_lag.min(n.saturating_sub(1)))
        .map(|k| {
            (0..n - k)
                .map(|t| (x[t] - m) * (x[t + k] - m))
                .sum::<f64>()
                / n as f64
        })
        .collect()
}

/// Default maximum AR order: min(n - 1, floor(10 * log10(n))).
pub fn default_max_order(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    ((10.0 * (n as f64).log10()).floor() as usize).min(n - 1)
}

/// Fit an AR model by Yule-Walker, choosing the order in 0..=max_order that
/// minimises AIC. Returns `None` for chains shorter than 2 or with zero
/// variance.
pub fn fit_ar_aic(x: &[f64], max_order: usize) -> Option<ArFit> {
    let n = x.len();
    if n < 2 || x.iter().all(|&v| v == x[0]) {
        return None;
    }
    let acov = autocovariances(x, max_order);
    let c0 = acov[0];
    if c0 <= 0.0 || !c0.is_finite() {
        return None;
    }
    let max_order = acov.len() - 1;

    // Levinson-Durbin. phi[k] holds the order-k coefficient vector.
    let mut phi: Vec<Vec<f64>> = vec![Vec::new()];
    let mut vars = vec![c0];
    for k in 1..=max_order {
        let prev = &phi[k - 1];
        let num = acov[k] - (1..k).map(|j| prev[j - 1] * acov[k - j]).sum::<f64>();
        let kappa = num / vars[k - 1];
        if !kappa.is_finite() || kappa.abs() >= 1.0 {
            break;
        }
        let mut next = Vec::with_capacity(k);
        for j in 1..k {
            next.push(prev[j - 1] - kappa * prev[k - j - 1]);
        }
        next.push(kappa);
        vars.push(vars[k - 1] * (1.0 - kappa * kappa));
        phi.push(next);
    }

    let nf = n as f64;
    let order = vars
        .iter()
        .enumerate()
        .map(|(k, &v)| (k, nf * v.ln() + 2.0 * k as f64 + 2.0))
        .filter(|(_, aic)| aic.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k)
        .unwrap_or(0);

    let var_pred = vars[order] * nf / (nf - (order as f64 + 1.0)).max(1.0);

    Some(ArFit {
        coefficients: phi[order].clone(),
        var_pred,
    })
}

/// Spectral density at zero from an AR fit. Zero for constant chains.
pub fn spectrum0_ar(x: &[f64]) -> f64 {
    match fit_ar_aic(x, default_max_order(x.len())) {
        Some(fit) => {
            let denom = 1.0 - fit.coefficients.iter().sum::<f64>();
            fit.var_pred / (denom * denom)
        }
        None => 0.0,
    }
}

/// Effective sample size of a chain.
pub fn effective_size(x: &[f64]) -> f64 {
    let spec = spectrum0_ar(x);
    if spec <= 0.0 || !spec.is_finite() {
        return 0.0;
    }
    x.len() as f64 * sample_variance(x) / spec
}
