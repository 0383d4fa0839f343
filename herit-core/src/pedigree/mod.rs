//! Pedigree construction.
//!
//! Builds the (animal, dam, sire) table from aggregated individuals, sorts it,
//! and completes it with a founder generation so every referenced parent has
//! its own row. The sampler requires a complete pedigree in which parents
//! precede their offspring; `validate` checks exactly that.

pub mod completion;

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::info;

use herit_data::tables::{IndividualSummary, PedigreeRow};

pub use completion::complete_pedigree;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PedigreeError {
    #[error("Individual {animal} listed with conflicting parents ({first:?} vs {second:?})")]
    ConflictingParents {
        animal: i64,
        first: (Option<i64>, Option<i64>),
        second: (Option<i64>, Option<i64>),
    },

    #[error("Individual {0} appears more than once")]
    Duplicate(i64),

    #[error("Individual {0} is listed as its own parent")]
    SelfParent(i64),

    #[error("Parent {parent} of individual {animal} has no row in the pedigree")]
    DanglingParent { animal: i64, parent: i64 },

    #[error("Parent {parent} of individual {animal} appears after its offspring")]
    ParentAfterOffspring { animal: i64, parent: i64 },
}

/// Summary counts for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedigreeStats {
    pub n_individuals: usize,
    pub n_founders: usize,
    pub n_dams: usize,
    pub n_sires: usize,
}

/// An ordered pedigree table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pedigree {
    rows: Vec<PedigreeRow>,
}

impl Pedigree {
    /// Wrap rows as-is. No validation is performed.
    pub fn from_rows(rows: Vec<PedigreeRow>) -> Self {
        Self { rows }
    }

    /// Build one row per distinct animal from aggregated summaries.
    ///
    /// An animal may occur once per treatment; repeats must agree on parents.
    pub fn from_summaries(summaries: &[IndividualSummary]) -> Result<Self, PedigreeError> {
        let mut seen: HashMap<i64, (Option<i64>, Option<i64>)> = HashMap::new();
        let mut rows = Vec::with_capacity(summaries.len());

        for s in summaries {
            let parents = (Some(s.dam), s.sire);
            match seen.get(&s.animal) {
                Some(&prev) if prev != parents => {
                    return Err(PedigreeError::ConflictingParents {
                        animal: s.animal,
                        first: prev,
                        second: parents,
                    });
                }
                Some(_) => continue,
                None => {
                    seen.insert(s.animal, parents);
                    rows.push(PedigreeRow {
                        animal: s.animal,
                        dam: parents.0,
                        sire: parents.1,
                    });
                }
            }
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PedigreeRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PedigreeRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sort rows by animal ID ascending.
    pub fn sort_by_id(&mut self) {
        self.rows.sort_by_key(|r| r.animal);
    }

    pub fn contains(&self, animal: i64) -> bool {
        self.rows.iter().any(|r| r.animal == animal)
    }

    pub fn get(&self, animal: i64) -> Option<&PedigreeRow> {
        self.rows.iter().find(|r| r.animal == animal)
    }

    /// Parents referenced by some row that have no row of their own, in
    /// ascending order.
    pub fn missing_parents(&self) -> BTreeSet<i64> {
        let present: HashSet<i64> = self.rows.iter().map(|r| r.animal).collect();
        self.rows
            .iter()
            .flat_map(|r| r.parents())
            .filter(|p| !present.contains(p))
            .collect()
    }

    /// Check that the table can be handed to the sampler.
    pub fn validate(&self) -> Result<(), PedigreeError> {
        let mut position: HashMap<i64, usize> = HashMap::with_capacity(self.rows.len());
        for (i, r) in self.rows.iter().enumerate() {
            if position.insert(r.animal, i).is_some() {
                return Err(PedigreeError::Duplicate(r.animal));
            }
        }

        for (i, r) in self.rows.iter().enumerate() {
            for parent in r.parents() {
                if parent == r.animal {
                    return Err(PedigreeError::SelfParent(r.animal));
                }
                match position.get(&parent) {
                    None => {
                        return Err(PedigreeError::DanglingParent {
                            animal: r.animal,
                            parent,
                        })
                    }
                    Some(&j) if j > i => {
                        return Err(PedigreeError::ParentAfterOffspring {
                            animal: r.animal,
                            parent,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Add founder rows for unlisted parents and put parents first.
    /// See [`complete_pedigree`].
    pub fn complete(self, founders: Option<&[i64]>) -> Self {
        complete_pedigree(self, founders)
    }

    pub fn stats(&self) -> PedigreeStats {
        let dams: HashSet<i64> = self.rows.iter().filter_map(|r| r.dam).collect();
        let sires: HashSet<i64> = self.rows.iter().filter_map(|r| r.sire).collect();
        PedigreeStats {
            n_individuals: self.rows.len(),
            n_founders: self
                .rows
                .iter()
                .filter(|r| r.dam.is_none() && r.sire.is_none())
                .count(),
            n_dams: dams.len(),
            n_sires: sires.len(),
        }
    }
}

/// Build, sort, complete and validate the pedigree for a cohort.
pub fn build_pedigree(summaries: &[IndividualSummary]) -> Result<Pedigree, PedigreeError> {
    let mut pedigree = Pedigree::from_summaries(summaries)?;
    pedigree.sort_by_id();
    let pedigree = pedigree.complete(None);
    pedigree.validate()?;

    let stats = pedigree.stats();
    info!(
        "Pedigree: {} individuals ({} founders), {} dams, {} sires",
        stats.n_individuals, stats.n_founders, stats.n_dams, stats.n_sires
    );
    Ok(pedigree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(animal: i64, dam: i64, trt: &str) -> IndividualSummary {
        IndividualSummary {
            animal,
            dam,
            sire: None,
            treatment: trt.into(),
            trait_mean: 1.0,
            n_obs: 1,
        }
    }

    #[test]
    fn test_from_summaries_dedups() {
        let ped = Pedigree::from_summaries(&[
            summary(2000, 9000, "a"),
            summary(1000, 9000, "a"),
            summary(2000, 9000, "b"),
        ])
        .unwrap();
        assert_eq!(ped.len(), 2);
    }

    #[test]
    fn test_conflicting_parents() {
        let err = Pedigree::from_summaries(&[summary(1000, 9000, "a"), summary(1000, 8000, "b")])
            .unwrap_err();
        assert!(matches!(err, PedigreeError::ConflictingParents { animal: 1000, .. }));
    }

    #[test]
    fn test_sort_by_id() {
        let mut ped =
            Pedigree::from_summaries(&[summary(3000, 9000, "a"), summary(1000, 9000, "a")])
                .unwrap();
        ped.sort_by_id();
        assert_eq!(ped.rows()[0].animal, 1000);
        assert_eq!(ped.rows()[1].animal, 3000);
    }

    #[test]
    fn test_validate_detects_problems() {
        let dangling = Pedigree::from_rows(vec![PedigreeRow {
            animal: 1,
            dam: Some(2),
            sire: None,
        }]);
        assert_eq!(
            dangling.validate(),
            Err(PedigreeError::DanglingParent { animal: 1, parent: 2 })
        );

        let late = Pedigree::from_rows(vec![
            PedigreeRow {
                animal: 1,
                dam: Some(2),
                sire: None,
            },
            PedigreeRow::founder(2),
        ]);
        assert_eq!(
            late.validate(),
            Err(PedigreeError::ParentAfterOffspring { animal: 1, parent: 2 })
        );

        let selfish = Pedigree::from_rows(vec![PedigreeRow {
            animal: 1,
            dam: Some(1),
            sire: None,
        }]);
        assert_eq!(selfish.validate(), Err(PedigreeError::SelfParent(1)));

        let dup = Pedigree::from_rows(vec![PedigreeRow::founder(1), PedigreeRow::founder(1)]);
        assert_eq!(dup.validate(), Err(PedigreeError::Duplicate(1)));
    }

    #[test]
    fn test_build_pedigree() {
        let ped = build_pedigree(&[
            summary(2000, 900_000, "a"),
            summary(1000, 900_000, "a"),
            summary(3000, 800_000, "a"),
        ])
        .unwrap();
        let stats = ped.stats();
        assert_eq!(stats.n_individuals, 5);
        assert_eq!(stats.n_founders, 2);
        assert_eq!(stats.n_dams, 2);
        assert_eq!(stats.n_sires, 0);
        assert!(ped.missing_parents().is_empty());
    }
}
