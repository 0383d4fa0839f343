//! Derived tables handed to the sampler: the per-individual dataset and the
//! pedigree.
//!
//! Both are written as comma-separated files with a header row. Missing
//! parents are written as `NA`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::measurement::parse_optional_f64;

/// Token used for unknown parents.
pub const MISSING: &str = "NA";

/// One aggregated row per (animal, dam, treatment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualSummary {
    pub animal: i64,
    pub dam: i64,
    /// Always unknown at this stage.
    pub sire: Option<i64>,
    pub treatment: String,
    /// Arithmetic mean of the retained trait values.
    pub trait_mean: f64,
    /// Number of observations averaged.
    pub n_obs: usize,
}

/// One (animal, dam, sire) pedigree row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PedigreeRow {
    pub animal: i64,
    pub dam: Option<i64>,
    pub sire: Option<i64>,
}

impl PedigreeRow {
    pub fn founder(animal: i64) -> Self {
        Self {
            animal,
            dam: None,
            sire: None,
        }
    }

    /// Known parents of this row, dam first.
    pub fn parents(&self) -> impl Iterator<Item = i64> {
        self.dam.into_iter().chain(self.sire)
    }
}

fn fmt_parent(p: Option<i64>) -> String {
    p.map(|v| v.to_string()).unwrap_or_else(|| MISSING.to_string())
}

fn parse_parent(s: &str, line_num: usize) -> Result<Option<i64>> {
    match s.trim() {
        "NA" | "na" | "." | "" | "0" => Ok(None),
        other => other
            .parse::<i64>()
            .map(Some)
            .with_context(|| format!("Invalid parent ID '{}' on line {}", other, line_num)),
    }
}

/// Write the modelling dataset. `response` names the trait column.
pub fn write_dataset(rows: &[IndividualSummary], response: &str, path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create dataset file: {}", path.display()))?;

    writer.write_record(["animal", "dam", "sire", "treatment", response, "n_obs"])?;
    for row in rows {
        writer.write_record([
            row.animal.to_string(),
            row.dam.to_string(),
            fmt_parent(row.sire),
            row.treatment.clone(),
            row.trait_mean.to_string(),
            row.n_obs.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a dataset previously written by `write_dataset`.
pub fn read_dataset(path: &Path, response: &str) -> Result<Vec<IndividualSummary>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let col = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Column '{}' not found in {}", name, path.display()))
    };
    let (animal, dam, sire, treatment, value, n_obs) = (
        col("animal")?,
        col("dam")?,
        col("sire")?,
        col("treatment")?,
        col(response)?,
        col("n_obs")?,
    );

    let mut rows = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let line_num = i + 2;
        let rec = rec.with_context(|| format!("Failed to read line {}", line_num))?;
        let trait_mean = parse_optional_f64(&rec[value])
            .with_context(|| format!("Invalid trait value on line {}", line_num))?
            .unwrap_or(f64::NAN);
        rows.push(IndividualSummary {
            animal: rec[animal]
                .parse()
                .with_context(|| format!("Invalid animal ID on line {}", line_num))?,
            dam: rec[dam]
                .parse()
                .with_context(|| format!("Invalid dam ID on line {}", line_num))?,
            sire: parse_parent(&rec[sire], line_num)?,
            treatment: rec[treatment].to_string(),
            trait_mean,
            n_obs: rec[n_obs]
                .parse()
                .with_context(|| format!("Invalid n_obs on line {}", line_num))?,
        });
    }
    Ok(rows)
}

/// Write a pedigree table (`animal,dam,sire`).
pub fn write_pedigree(rows: &[PedigreeRow], path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create pedigree file: {}", path.display()))?;

    writer.write_record(["animal", "dam", "sire"])?;
    for row in rows {
        // `0` reads back as an unknown parent.
        if let Some(id) = std::iter::once(row.animal)
            .chain(row.parents())
            .find(|&id| id <= 0)
        {
            bail!(
                "Pedigree ID {} for animal {} is not positive: {}",
                id,
                row.animal,
                path.display()
            );
        }
        writer.write_record([
            row.animal.to_string(),
            fmt_parent(row.dam),
            fmt_parent(row.sire),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a three-column pedigree table. Parent IDs of `NA`, `.`, `0` or empty
/// are treated as unknown.
pub fn read_pedigree(path: &Path) -> Result<Vec<PedigreeRow>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to read pedigree file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let line_num = i + 2;
        let rec = rec.with_context(|| format!("Failed to read line {}", line_num))?;
        if rec.len() < 3 {
            bail!("Line {} has {} fields, expected 3", line_num, rec.len());
        }
        rows.push(PedigreeRow {
            animal: rec[0]
                .parse()
                .with_context(|| format!("Invalid animal ID '{}' on line {}", &rec[0], line_num))?,
            dam: parse_parent(&rec[1], line_num)?,
            sire: parse_parent(&rec[2], line_num)?,
        });
    }
    Ok(rows)
}
