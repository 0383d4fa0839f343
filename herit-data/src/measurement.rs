//! Growth-measurement table reader.
//!
//! Reads a delimited file with a header row (tab, comma or whitespace,
//! detected from the header) into one `MeasurementRecord` per row. Runs of
//! spaces in whitespace-delimited files count as one separator, so aligned
//! columns read cleanly. Only the columns named in `ColumnMap` are consulted;
//! anything else is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

/// Names of the input columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub id: String,
    pub dam: String,
    pub age: String,
    pub genotype: String,
    pub treatment: String,
    pub trait_value: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "ID".into(),
            dam: "Damid".into(),
            age: "Week".into(),
            genotype: "Genotype".into(),
            treatment: "Treatment".into(),
            trait_value: "ApertureIndex".into(),
        }
    }
}

/// One raw measurement row. Never mutated after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Raw individual identifier, prefix included.
    pub id: String,
    /// Raw dam lineage label, prefix included.
    pub dam: String,
    /// Age in weeks (`None` when missing).
    pub age_weeks: Option<f64>,
    pub genotype: String,
    pub treatment: String,
    /// Trait value (`None` when missing).
    pub trait_value: Option<f64>,
}

struct ColumnIndices {
    id: usize,
    dam: usize,
    age: usize,
    genotype: usize,
    treatment: usize,
    trait_value: usize,
}

impl ColumnIndices {
    fn resolve(headers: &StringRecord, columns: &ColumnMap) -> Result<Self> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow!("Column '{}' not found in header", name))
        };
        Ok(Self {
            id: find(&columns.id)?,
            dam: find(&columns.dam)?,
            age: find(&columns.age)?,
            genotype: find(&columns.genotype)?,
            treatment: find(&columns.treatment)?,
            trait_value: find(&columns.trait_value)?,
        })
    }

    fn max(&self) -> usize {
        [
            self.id,
            self.dam,
            self.age,
            self.genotype,
            self.treatment,
            self.trait_value,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Detect the field delimiter from a header line.
pub fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.contains('\t') {
        b'\t'
    } else if header_line.contains(',') {
        b','
    } else {
        b' '
    }
}

/// Rewrite each line with single spaces between fields.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        if let Some(first) = fields.next() {
            out.push_str(first);
            for f in fields {
                out.push(' ');
                out.push_str(f);
            }
        }
        out.push('\n');
    }
    out
}

/// Parse a numeric field, mapping the usual missing-value tokens to `None`.
pub fn parse_optional_f64(s: &str) -> Result<Option<f64>> {
    match s.trim() {
        "NA" | "na" | "Na" | "." | "" | "NaN" | "nan" => Ok(None),
        other => other
            .parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow!("'{}' is not a number", other)),
    }
}

/// Read a measurement table.
pub fn read_measurements(path: &Path, columns: &ColumnMap) -> Result<Vec<MeasurementRecord>> {
    let header_line = {
        let file = File::open(path)
            .with_context(|| format!("Failed to open measurement file: {}", path.display()))?;
        let mut line = String::new();
        BufReader::new(file)
            .read_line(&mut line)
            .with_context(|| format!("Failed to read header of {}", path.display()))?;
        line
    };
    if header_line.trim().is_empty() {
        bail!("Empty measurement file: {}", path.display());
    }

    let delimiter = detect_delimiter(&header_line);
    let source: Box<dyn Read> = if delimiter == b' ' {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read measurement file: {}", path.display()))?;
        Box::new(Cursor::new(collapse_whitespace(&text)))
    } else {
        Box::new(
            File::open(path)
                .with_context(|| format!("Failed to read measurement file: {}", path.display()))?,
        )
    };
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .context("Failed to read measurement header")?
        .clone();
    let idx = ColumnIndices::resolve(&headers, columns)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        // Header is line 1.
        let line_num = i + 2;
        let row = row.with_context(|| format!("Failed to read line {}", line_num))?;
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }
        if row.len() <= idx.max() {
            bail!(
                "Line {} has too few fields (expected at least {})",
                line_num,
                idx.max() + 1
            );
        }

        let age_weeks = parse_optional_f64(&row[idx.age])
            .with_context(|| format!("Invalid age on line {}", line_num))?;
        let trait_value = parse_optional_f64(&row[idx.trait_value])
            .with_context(|| format!("Invalid trait value on line {}", line_num))?;

        records.push(MeasurementRecord {
            id: row[idx.id].to_string(),
            dam: row[idx.dam].to_string(),
            age_weeks,
            genotype: row[idx.genotype].to_string(),
            treatment: row[idx.treatment].to_string(),
            trait_value,
        });
    }

    tracing::info!(
        "Loaded {} measurement rows from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growth.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_optional_f64() {
        assert_eq!(parse_optional_f64("1.5").unwrap(), Some(1.5));
        assert_eq!(parse_optional_f64(" 12 ").unwrap(), Some(12.0));
        assert_eq!(parse_optional_f64("NA").unwrap(), None);
        assert_eq!(parse_optional_f64("").unwrap(), None);
        assert!(parse_optional_f64("twelve").is_err());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("ID\tWeek"), b'\t');
        assert_eq!(detect_delimiter("ID,Week"), b',');
        assert_eq!(detect_delimiter("ID Week"), b' ');
    }

    #[test]
    fn test_read_tab_file() {
        let (_dir, path) = write_file(
            "ID\tDamid\tWeek\tGenotype\tTreatment\tApertureIndex\tExtra\n\
             CZA-1\tCZA-100\t12\tG1\tcontrol\t0.81\tx\n\
             CZA-1\tCZA-100\t14\tG1\tcontrol\tNA\tx\n\
             CZD-2\tCZD-200\t8\tG2\tstress\t0.77\tx\n",
        );
        let records = read_measurements(&path, &ColumnMap::default()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "CZA-1");
        assert_eq!(records[0].dam, "CZA-100");
        assert_eq!(records[0].age_weeks, Some(12.0));
        assert_eq!(records[0].trait_value, Some(0.81));
        assert_eq!(records[1].trait_value, None);
        assert_eq!(records[2].treatment, "stress");
    }

    #[test]
    fn test_read_csv_custom_columns() {
        let (_dir, path) = write_file(
            "snail,mother,age,geno,trt,ai\n\
             A1,M1,20,g,t1,1.25\n",
        );
        let columns = ColumnMap {
            id: "snail".into(),
            dam: "mother".into(),
            age: "age".into(),
            genotype: "geno".into(),
            treatment: "trt".into(),
            trait_value: "ai".into(),
        };
        let records = read_measurements(&path, &columns).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trait_value, Some(1.25));
    }

    #[test]
    fn test_read_aligned_space_columns() {
        let (_dir, path) = write_file(
            "ID     Damid    Week  Genotype  Treatment  ApertureIndex\n\
             CZA-1  CZA-100  12    G1        control    0.81\n\
             \n\
             CZA-22 CZA-100   8    G1        control    NA\n",
        );
        let records = read_measurements(&path, &ColumnMap::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "CZA-1");
        assert_eq!(records[0].dam, "CZA-100");
        assert_eq!(records[0].age_weeks, Some(12.0));
        assert_eq!(records[0].genotype, "G1");
        assert_eq!(records[0].treatment, "control");
        assert_eq!(records[0].trait_value, Some(0.81));
        assert_eq!(records[1].id, "CZA-22");
        assert_eq!(records[1].age_weeks, Some(8.0));
        assert_eq!(records[1].trait_value, None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a   b\tc \n\nd  e"), "a b c\n\nd e\n");
    }

    #[test]
    fn test_missing_column_fails() {
        let (_dir, path) = write_file("ID,Week\nA1,12\n");
        let err = read_measurements(&path, &ColumnMap::default()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_non_numeric_age_fails() {
        let (_dir, path) = write_file(
            "ID,Damid,Week,Genotype,Treatment,ApertureIndex\n\
             A1,M1,twelve,g,t,1.0\n",
        );
        let err = read_measurements(&path, &ColumnMap::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
