//! Chain autocorrelation.
//!
//! Lags are in units of retained samples, so lag 1 is one thinning interval.

use herit_data::chains::ChainSet;

use crate::util::math::mean;

/// Lags reported by default.
pub const DEFAULT_LAGS: [usize; 5] = [0, 1, 5, 10, 50];

/// Autocorrelation of one chain at each requested lag. Lags at or beyond the
/// chain length are skipped. NaN for a constant chain.
pub fn autocorr_diag(x: &[f64], lags: &[usize]) -> Vec<(usize, f64)> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let m = mean(x);
    let c0: f64 = x.iter().map(|&v| (v - m) * (v - m)).sum();

    lags.iter()
        .copied()
        .filter(|&k| k < n)
        .map(|k| {
            let ck: f64 = (0..n - k).map(|t| (x[t] - m) * (x[t + k] - m)).sum();
            let r = if c0 > 0.0 { ck / c0 } else { f64::NAN };
            (k, r)
        })
        .collect()
}

/// Cross-correlation matrix at `lag`: entry (i, j) correlates parameter i at
/// sample t + lag with parameter j at sample t.
pub fn autocorr_matrix(chains: &ChainSet, lag: usize) -> Vec<Vec<f64>> {
    let n = chains.n_samples();
    let p = chains.n_params();
    if lag >= n {
        return vec![vec![f64::NAN; p]; p];
    }

    let centered: Vec<Vec<f64>> = chains
        .columns()
        .iter()
        .map(|c| {
            let m = mean(c);
            c.iter().map(|&v| v - m).collect()
        })
        .collect();
    let scale: Vec<f64> = centered
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();

    (0..p)
        .map(|i| {
            (0..p)
                .map(|j| {
                    let s: f64 = (0..n - lag)
                        .map(|t| centered[i][t + lag] * centered[j][t])
                        .sum();
                    let d = scale[i] * scale[j];
                    if d > 0.0 {
                        s / d
                    } else {
                        f64::NAN
                    }
                })
                .collect()
        })
        .collect()
}
