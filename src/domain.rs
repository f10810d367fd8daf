//! Domain module - core types and capability interfaces
//!
//! Pure value types (queries, candidates, outcomes, reports) and the traits
//! the pipeline needs from search providers, liveness probes and table stores.

pub mod allow_list;
pub mod candidate;
pub mod errors;
pub mod outcome;
pub mod query;
pub mod report;
pub mod services;

// Re-export commonly used items for convenience
pub use allow_list::HostAllowList;
pub use candidate::{Candidate, CandidateSource};
pub use errors::{ConfigError, StoreError, StoreResult};
pub use outcome::{ResolutionOutcome, RowResolution, RowSnapshot, SkipReason};
pub use query::Query;
pub use report::{PassReport, SheetReport};
pub use services::{LivenessProbe, SearchProvider, TabularStore};
