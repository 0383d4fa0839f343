//! Per-individual trait aggregation.
//!
//! Keeps measurements taken after the growth curve has flattened
//! (age strictly above `min_age`), then averages the trait per
//! (animal, dam, treatment). Grouping on dam alongside animal only matters if
//! an individual is recorded under two dam labels, in which case each label
//! gets its own row.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use herit_data::ids::IdNormalizer;
use herit_data::measurement::MeasurementRecord;
use herit_data::tables::IndividualSummary;

/// Default age threshold in weeks (exclusive): week 12 onward is retained.
pub const DEFAULT_MIN_AGE_WEEKS: f64 = 10.0;

/// Aggregation settings.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Rows with age <= this value are dropped.
    pub min_age_weeks: f64,
    /// Treatment cohort carried forward to modelling.
    pub treatment: Option<String>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            min_age_weeks: DEFAULT_MIN_AGE_WEEKS,
            treatment: None,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    n: usize,
}

/// Filter to the asymptotic-growth window and average per group.
///
/// Rows with a missing age or trait value are dropped. IDs and dam labels are
/// normalized with `normalizer`; a malformed identifier is fatal.
pub fn aggregate_traits(
    records: &[MeasurementRecord],
    normalizer: &IdNormalizer,
    min_age_weeks: f64,
) -> Result<Vec<IndividualSummary>> {
    let mut groups: BTreeMap<(i64, i64, String), Accumulator> = BTreeMap::new();
    let mut n_kept = 0usize;
    let mut n_missing = 0usize;

    for (i, rec) in records.iter().enumerate() {
        let (Some(age), Some(value)) = (rec.age_weeks, rec.trait_value) else {
            n_missing += 1;
            continue;
        };
        if age <= min_age_weeks {
            continue;
        }

        let animal = normalizer
            .normalize(&rec.id)
            .with_context(|| format!("Invalid individual ID in row {}", i + 1))?;
        let dam = normalizer
            .normalize(&rec.dam)
            .with_context(|| format!("Invalid dam ID in row {}", i + 1))?;

        let acc = groups
            .entry((animal, dam, rec.treatment.clone()))
            .or_default();
        acc.sum += value;
        acc.n += 1;
        n_kept += 1;
    }

    if n_missing > 0 {
        debug!("Dropped {} rows with missing age or trait value", n_missing);
    }
    info!(
        "Retained {} of {} rows with age > {} weeks",
        n_kept,
        records.len(),
        min_age_weeks
    );

    let summaries: Vec<IndividualSummary> = groups
        .into_iter()
        .map(|((animal, dam, treatment), acc)| IndividualSummary {
            animal,
            dam,
            sire: None,
            treatment,
            trait_mean: acc.sum / acc.n as f64,
            n_obs: acc.n,
        })
        .collect();

    info!("Aggregated into {} individual rows", summaries.len());
    Ok(summaries)
}

/// Keep only the rows of one treatment cohort.
pub fn select_treatment(summaries: Vec<IndividualSummary>, treatment: &str) -> Vec<IndividualSummary> {
    let before = summaries.len();
    let kept: Vec<IndividualSummary> = summaries
        .into_iter()
        .filter(|s| s.treatment == treatment)
        .collect();
    info!(
        "Treatment '{}': {} of {} individual rows",
        treatment,
        kept.len(),
        before
    );
    kept
}

/// Run aggregation and cohort selection together.
pub fn prepare_cohort(
    records: &[MeasurementRecord],
    normalizer: &IdNormalizer,
    config: &AggregateConfig,
) -> Result<Vec<IndividualSummary>> {
    let summaries = aggregate_traits(records, normalizer, config.min_age_weeks)?;
    let cohort = match &config.treatment {
        Some(t) => select_treatment(summaries, t),
        None => summaries,
    };
    if cohort.is_empty() {
        bail!(
            "No individuals left after filtering (age > {}, treatment {:?})",
            config.min_age_weeks,
            config.treatment
        );
    }
    Ok(cohort)
}
