//! Posterior chain tables.
//!
//! A sampler reports each chain collection (fixed effects, variance
//! components) as a CSV file: one column per parameter, one row per retained
//! sample, header row of parameter names.

use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

/// Named, equal-length sample sequences for a set of parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainSet {
    names: Vec<String>,
    /// `columns[j][i]` = sample i of parameter j.
    columns: Vec<Vec<f64>>,
}

impl ChainSet {
    /// Build from (name, samples) pairs. All chains must have the same length
    /// and names must be unique.
    pub fn new(chains: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let mut names = Vec::with_capacity(chains.len());
        let mut columns = Vec::with_capacity(chains.len());
        for (name, samples) in chains {
            if names.contains(&name) {
                bail!("Duplicate parameter name '{}'", name);
            }
            if let Some(first) = columns.first().map(|c: &Vec<f64>| c.len()) {
                if samples.len() != first {
                    bail!(
                        "Chain '{}' has {} samples, expected {}",
                        name,
                        samples.len(),
                        first
                    );
                }
            }
            names.push(name);
            columns.push(samples);
        }
        Ok(Self { names, columns })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_params(&self) -> usize {
        self.names.len()
    }

    pub fn n_samples(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Samples for a named parameter.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.columns[j].as_slice())
    }

    /// Iterate over (name, samples).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .zip(self.columns.iter())
            .map(|(n, c)| (n.as_str(), c.as_slice()))
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }
}

/// Read a chain table.
pub fn read_chains(path: &Path) -> Result<ChainSet> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to read chain file: {}", path.display()))?;

    let names: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        // Some writers emit quoted or blank row-name columns; skip the latter.
        .map(|h| h.trim_matches('"').to_string())
        .collect();
    let skip_first = names.first().is_some_and(|n| n.is_empty());

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for (i, rec) in reader.records().enumerate() {
        let line_num = i + 2;
        let rec = rec.with_context(|| format!("Failed to read line {}", line_num))?;
        if rec.len() != names.len() {
            bail!(
                "Line {} of {} has {} fields, expected {}",
                line_num,
                path.display(),
                rec.len(),
                names.len()
            );
        }
        for (j, field) in rec.iter().enumerate() {
            if skip_first && j == 0 {
                continue;
            }
            let v: f64 = field.parse().with_context(|| {
                format!("Invalid sample '{}' on line {} of {}", field, line_num, path.display())
            })?;
            columns[j].push(v);
        }
    }

    let pairs: Vec<(String, Vec<f64>)> = names
        .into_iter()
        .zip(columns)
        .skip(usize::from(skip_first))
        .collect();
    let chains = ChainSet::new(pairs)?;
    tracing::debug!(
        "Read {} parameters x {} samples from {}",
        chains.n_params(),
        chains.n_samples(),
        path.display()
    );
    Ok(chains)
}

/// Write a chain table.
pub fn write_chains(chains: &ChainSet, path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create chain file: {}", path.display()))?;
    writer.write_record(chains.names())?;
    for i in 0..chains.n_samples() {
        writer.write_record(chains.columns().iter().map(|c| c[i].to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
