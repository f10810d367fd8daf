//! sheet-image-fill
//!
//! Fills a spreadsheet column with image URLs. Each data row is turned into a
//! search query, run through an ordered list of image search providers, and
//! the first candidate that passes the host allow-list and answers a liveness
//! probe is written back. Rows that already have a value are left alone, so
//! re-running a pass only fills what is still missing.

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod runner;

pub use application::{RowResolver, TableOrchestrator};
pub use domain::{PassReport, SearchProvider, TabularStore};
pub use infrastructure::{AppConfig, ConfigManager, Workbook};
