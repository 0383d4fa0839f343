//! herit-data: table I/O for herit
//!
//! Reads growth-measurement files, normalizes population-coded identifiers,
//! and reads/writes the derived tables exchanged with a posterior sampler:
//! the per-individual dataset, the pedigree, and posterior chain files.

pub mod chains;
pub mod ids;
pub mod measurement;
pub mod tables;

pub use chains::ChainSet;
pub use ids::{IdError, IdNormalizer};
pub use measurement::{ColumnMap, MeasurementRecord};
pub use tables::{IndividualSummary, PedigreeRow};
