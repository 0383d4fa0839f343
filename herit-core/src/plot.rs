//! Trace and density plots rendered to SVG.
//!
//! One file per parameter: the trace on the left, a kernel density estimate on
//! the right. A well-mixed chain shows a trace like white noise and a
//! unimodal density.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use plotters::prelude::*;
use tracing::{debug, info};

use herit_data::chains::ChainSet;

use crate::diagnostics::hpd::{bandwidth_nrd0, kernel_density};

const PLOT_SIZE: (u32, u32) = (1200, 400);

/// File-system safe stem for a parameter name, e.g. `(Intercept)` becomes
/// `Intercept`.
pub fn plot_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "param".to_string()
    } else {
        stem.to_string()
    }
}

fn value_range(x: &[f64]) -> (f64, f64) {
    let lo = x.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Draw the trace and density of one chain to `path`.
pub fn plot_trace_density(name: &str, x: &[f64], path: &Path) -> Result<()> {
    let finite: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        bail!("No finite samples to plot for '{}'", name);
    }

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1, 2));
    let (y_lo, y_hi) = value_range(&finite);

    let mut trace = ChartBuilder::on(&panels[0])
        .caption(format!("Trace of {}", name), ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x.len().max(1) as f64, y_lo..y_hi)?;
    trace
        .configure_mesh()
        .x_desc("Iterations (retained)")
        .y_desc(name)
        .draw()?;
    trace.draw_series(LineSeries::new(
        x.iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, &v)| (i as f64, v)),
        &BLACK,
    ))?;

    let (grid, density) = kernel_density(&finite, bandwidth_nrd0(&finite));
    let d_max = density.iter().copied().fold(0.0f64, f64::max).max(1e-12) * 1.05;
    let (g_lo, g_hi) = match (grid.first(), grid.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => (y_lo, y_hi),
    };

    let mut dens = ChartBuilder::on(&panels[1])
        .caption(format!("Density of {}", name), ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(g_lo..g_hi, 0f64..d_max)?;
    dens.configure_mesh()
        .x_desc(format!("N = {}", finite.len()))
        .y_desc("Density")
        .draw()?;
    dens.draw_series(LineSeries::new(grid.into_iter().zip(density), &BLUE))?;

    root.present()
        .with_context(|| format!("Failed to write plot {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Plot every chain in a collection into `dir`, returning the files written.
pub fn plot_chains(chains: &ChainSet, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create plot directory {}", dir.display()))?;
    let mut written = Vec::with_capacity(chains.n_params());
    for (name, x) in chains.iter() {
        let path = dir.join(format!("{}_{}.svg", prefix, plot_file_stem(name)));
        plot_trace_density(name, x, &path)?;
        written.push(path);
    }
    info!("Wrote {} {} plots to {}", written.len(), prefix, dir.display());
    Ok(written)
}
