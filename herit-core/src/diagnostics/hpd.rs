//! Highest posterior density intervals and posterior modes.

use crate::util::math::{quantile_sorted, sample_sd, sorted_copy};

/// Default credible mass.
pub const DEFAULT_PROB: f64 = 0.95;

/// Shortest interval spanning `round(prob * n)` order-statistic gaps.
///
/// Returns `None` for an empty chain or a chain containing NaN.
pub fn hpd_interval(x: &[f64], prob: f64) -> Option<(f64, f64)> {
    let n = x.len();
    if n == 0 || x.iter().any(|v| v.is_nan()) {
        return None;
    }
    if n == 1 {
        return Some((x[0], x[0]));
    }
    let vals = sorted_copy(x);
    let gap = ((n as f64 * prob.clamp(0.0, 1.0)).round() as usize).clamp(1, n - 1);

    let best = (0..n - gap)
        .min_by(|&a, &b| {
            (vals[a + gap] - vals[a]).total_cmp(&(vals[b + gap] - vals[b]))
        })
        .unwrap_or(0);
    Some((vals[best], vals[best + gap]))
}

/// Bandwidth adjustment used for posterior modes.
pub const MODE_ADJUST: f64 = 0.1;

const KDE_POINTS: usize = 512;
const KDE_CUT: f64 = 3.0;

/// Silverman's rule-of-thumb bandwidth:
/// 0.9 * min(sd, IQR / 1.34) * n^(-1/5), with fallbacks for degenerate data.
pub fn bandwidth_nrd0(x: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return 1.0;
    }
    let sorted = sorted_copy(x);
    let sd = sample_sd(x);
    let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
    let mut lo = sd.min(iqr / 1.34);
    if lo.is_nan() || lo <= 0.0 {
        lo = if sd > 0.0 {
            sd
        } else if x[0] != 0.0 {
            x[0].abs()
        } else {
            1.0
        };
    }
    0.9 * lo * (n as f64).powf(-0.2)
}

/// Gaussian kernel density estimate evaluated on an even grid from
/// `min - cut * bw` to `max + cut * bw`. Returns (grid, density).
pub fn kernel_density(x: &[f64], bw: f64) -> (Vec<f64>, Vec<f64>) {
    if x.is_empty() || bw.is_nan() || bw <= 0.0 {
        return (Vec::new(), Vec::new());
    }
    let sorted = sorted_copy(x);
    let lo = sorted[0] - KDE_CUT * bw;
    let hi = sorted[sorted.len() - 1] + KDE_CUT * bw;
    let step = (hi - lo) / (KDE_POINTS - 1) as f64;
    let norm = 1.0 / (x.len() as f64 * bw * (2.0 * std::f64::consts::PI).sqrt());

    let grid: Vec<f64> = (0..KDE_POINTS).map(|i| lo + i as f64 * step).collect();
    let density = grid
        .iter()
        .map(|&g| {
            x.iter()
                .map(|&v| {
                    let u = (g - v) / bw;
                    (-0.5 * u * u).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect();
    (grid, density)
}

/// Posterior mode: location of the maximum of a kernel density estimate with
/// bandwidth `adjust * nrd0`.
pub fn posterior_mode(x: &[f64], adjust: f64) -> Option<f64> {
    if x.is_empty() || x.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if x.iter().all(|&v| v == x[0]) {
        return Some(x[0]);
    }
    let (grid, density) = kernel_density(x, adjust * bandwidth_nrd0(x));
    density
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| grid[i])
}
