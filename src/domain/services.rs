//! Capability interfaces the resolution pipeline depends on
//!
//! Concrete implementations live in the infrastructure layer; tests supply
//! their own in-memory versions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::candidate::Candidate;
use super::errors::StoreResult;
use super::query::Query;

/// One image search backend turning a query into ranked candidate URLs
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name used in logs and candidate provenance
    fn name(&self) -> &'static str;

    /// Page cursors to try, in order. Their meaning is provider specific
    /// (result offset, start index, page number).
    fn page_cursors(&self) -> &[u32];

    /// Search one page. Ordinary "no results" and transient failures yield an
    /// empty list; candidates keep the provider's ranking and contain no repeats.
    async fn search(&self, query: &Query, cursor: u32) -> Vec<Candidate>;
}

/// Admissibility and reachability checks for candidate URLs
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Host allow-list check, no I/O
    fn is_admissible(&self, url: &str) -> bool;

    /// Lightweight existence probe. Any failure resolves to `false`.
    async fn is_live(&self, url: &str, timeout: Duration) -> bool;
}

/// Sheet-oriented table access. Rows and columns are 1-based; row 1 holds headers.
pub trait TabularStore {
    /// Sheet names in workbook order
    fn sheets(&self) -> Vec<String>;

    /// Makes sure every name in `names` exists as a header, appending missing
    /// ones as new columns. Returns the full header → column map of the sheet.
    fn ensure_headers(&mut self, sheet: &str, names: &[&str]) -> StoreResult<HashMap<String, usize>>;

    /// Last populated row index (header row included)
    fn row_count(&self, sheet: &str) -> StoreResult<usize>;

    fn get_cell(&self, sheet: &str, row: usize, column: usize) -> StoreResult<Option<String>>;

    fn set_cell(&mut self, sheet: &str, row: usize, column: usize, value: &str) -> StoreResult<()>;

    /// Persists the whole table; returns where it was written, if anywhere
    fn save(&mut self) -> StoreResult<Option<PathBuf>>;
}
