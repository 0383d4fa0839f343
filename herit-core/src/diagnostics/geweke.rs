//! Geweke convergence diagnostic.
//!
//! Compares the mean of an early window of the chain with the mean of a late
//! window:
//!   z = (mean_a - mean_b) / sqrt(S_a(0) / n_a + S_b(0) / n_b)
//! where S(0) is the spectral density at zero of each window. Under
//! stationarity z is approximately standard normal, so a two-sided p-value
//! below the chosen alpha points at a chain that has not settled.

use statrs::distribution::{ContinuousCDF, Normal};

use super::spectrum::spectrum0_ar;
use crate::util::math::mean;

/// Default fraction of the chain in the first window.
pub const DEFAULT_FIRST: f64 = 0.1;
/// Default fraction of the chain in the last window.
pub const DEFAULT_LAST: f64 = 0.5;

/// Result of a Geweke test on one chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GewekeResult {
    pub z: f64,
    /// Two-sided p-value.
    pub pvalue: f64,
    pub n_first: usize,
    pub n_last: usize,
}

/// Index ranges (half-open) of the first and last windows of an `n`-sample
/// chain.
pub fn geweke_windows(n: usize, first: f64, last: f64) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    if n == 0 {
        return (0..0, 0..0);
    }
    let span = (n - 1) as f64;
    let end_a = ((1.0 + first * span).ceil() as usize).clamp(1, n);
    let start_b = ((n as f64 - last * span).floor() as usize).clamp(1, n) - 1;
    (0..end_a, start_b..n)
}

/// Run the Geweke test. `None` when either window has fewer than two
/// samples or both windows have zero spectral variance.
pub fn geweke(x: &[f64], first: f64, last: f64) -> Option<GewekeResult> {
    if first <= 0.0 || last <= 0.0 || first + last > 1.0 {
        return None;
    }
    let (a, b) = geweke_windows(x.len(), first, last);
    let xa = &x[a];
    let xb = &x[b];
    if xa.len() < 2 || xb.len() < 2 {
        return None;
    }

    let var = spectrum0_ar(xa) / xa.len() as f64 + spectrum0_ar(xb) / xb.len() as f64;
    if var <= 0.0 || !var.is_finite() {
        return None;
    }
    let z = (mean(xa) - mean(xb)) / var.sqrt();
    let norm = Normal::new(0.0, 1.0).unwrap();
    let pvalue = 2.0 * (1.0 - norm.cdf(z.abs()));

    Some(GewekeResult {
        z,
        pvalue,
        n_first: xa.len(),
        n_last: xb.len(),
    })
}
