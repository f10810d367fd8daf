//! Application layer module
//!
//! The resolution pipeline: per-row resolution and the whole-table pass
//! that drives it.

pub mod row_resolver;
pub mod table_orchestrator;

pub use row_resolver::{ResolverSettings, RowResolver};
pub use table_orchestrator::{OrchestratorSettings, TableOrchestrator};
