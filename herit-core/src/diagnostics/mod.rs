//! MCMC output diagnostics.
//!
//! Each diagnostic works on a single chain (or a set of equal-length chains)
//! and is independent of the others:
//! - autocorrelation at a set of lags
//! - effective sample size from the spectral density at zero
//! - Geweke stationarity test
//! - HPD intervals and posterior modes

pub mod autocorr;
pub mod convergence;
pub mod geweke;
pub mod hpd;
pub mod spectrum;

pub use autocorr::{autocorr_diag, autocorr_matrix};
pub use convergence::{ConvergenceReport, ConvergenceThresholds, ParameterDiagnostics};
pub use geweke::{geweke, GewekeResult};
pub use hpd::{hpd_interval, posterior_mode};
pub use spectrum::{effective_size, spectrum0_ar};
