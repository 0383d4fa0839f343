//! Build the per-individual dataset and the completed pedigree.
//!
//! herit prepare --data-file growth.txt --treatment Control --output-dir run1

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use herit_core::aggregate::{prepare_cohort, AggregateConfig};
use herit_core::pedigree::{build_pedigree, Pedigree};
use herit_core::sampler::external::{DATA_FILE, PEDIGREE_FILE};
use herit_data::ids::IdNormalizer;
use herit_data::measurement::{read_measurements, ColumnMap};
use herit_data::tables::{write_dataset, write_pedigree, IndividualSummary};

/// Input and cohort options shared by `prepare` and `fit`.
#[derive(Args)]
pub struct DataArgs {
    /// Growth measurement file (tab, comma or space delimited, with header)
    #[arg(long)]
    pub data_file: String,

    /// Treatment cohort to model
    #[arg(long)]
    pub treatment: String,

    /// Keep measurements with age (weeks) strictly above this
    #[arg(long, default_value = "10")]
    pub min_age: f64,

    /// Individual ID column
    #[arg(long, default_value = "ID")]
    pub id_col: String,

    /// Dam lineage column
    #[arg(long, default_value = "Damid")]
    pub dam_col: String,

    /// Age-in-weeks column
    #[arg(long, default_value = "Week")]
    pub age_col: String,

    /// Genotype column
    #[arg(long, default_value = "Genotype")]
    pub genotype_col: String,

    /// Treatment column
    #[arg(long, default_value = "Treatment")]
    pub treatment_col: String,

    /// Trait column
    #[arg(long, default_value = "ApertureIndex")]
    pub trait_col: String,

    /// Accepted ID prefixes (comma-separated); empty accepts any alphabetic prefix
    #[arg(long, default_value = "")]
    pub id_prefixes: String,

    /// Multiplier applied to numeric ID suffixes
    #[arg(long, default_value = "1000")]
    pub id_scale: i64,
}

impl DataArgs {
    pub fn column_map(&self) -> ColumnMap {
        ColumnMap {
            id: self.id_col.clone(),
            dam: self.dam_col.clone(),
            age: self.age_col.clone(),
            genotype: self.genotype_col.clone(),
            treatment: self.treatment_col.clone(),
            trait_value: self.trait_col.clone(),
        }
    }

    pub fn normalizer(&self) -> IdNormalizer {
        let prefixes: Vec<&str> = self
            .id_prefixes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if prefixes.is_empty() {
            IdNormalizer::any_prefix(self.id_scale)
        } else {
            IdNormalizer::with_prefixes(prefixes, self.id_scale)
        }
    }

    /// Load, aggregate, select the cohort and build the pedigree.
    pub fn load_cohort(&self) -> Result<(Vec<IndividualSummary>, Pedigree)> {
        info!("Data file: {}", self.data_file);
        info!("Treatment: {}", self.treatment);

        let records = read_measurements(Path::new(&self.data_file), &self.column_map())?;
        let config = AggregateConfig {
            min_age_weeks: self.min_age,
            treatment: Some(self.treatment.clone()),
        };
        let cohort = prepare_cohort(&records, &self.normalizer(), &config)?;
        let pedigree = build_pedigree(&cohort).context("Pedigree construction failed")?;
        Ok((cohort, pedigree))
    }
}

#[derive(Args)]
pub struct PrepareArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Directory for data.csv and pedigree.csv
    #[arg(long, default_value = ".")]
    output_dir: String,
}

pub fn run(args: PrepareArgs) -> Result<()> {
    info!("=== herit prepare ===");
    let (cohort, pedigree) = args.data.load_cohort()?;

    let out = Path::new(&args.output_dir);
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let data_path = out.join(DATA_FILE);
    let ped_path = out.join(PEDIGREE_FILE);
    write_dataset(&cohort, &args.data.trait_col, &data_path)?;
    write_pedigree(pedigree.rows(), &ped_path)?;

    let stats = pedigree.stats();
    println!("Individuals modelled: {}", cohort.len());
    println!(
        "Pedigree rows: {} ({} founders, {} dams, {} sires)",
        stats.n_individuals, stats.n_founders, stats.n_dams, stats.n_sires
    );
    println!("Dataset written to {}", data_path.display());
    println!("Pedigree written to {}", ped_path.display());
    Ok(())
}
