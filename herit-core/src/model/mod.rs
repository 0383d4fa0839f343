//! Model configuration and fitted posteriors.

pub mod posterior;
pub mod serialization;
pub mod spec;

pub use posterior::Posterior;
pub use spec::{Family, McmcSchedule, ModelSpec, PriorSpec, VariancePrior};
