//! Per-sheet and whole-pass counters

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::outcome::{ResolutionOutcome, RowResolution, SkipReason};

/// Counts for one sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    /// Data rows (header row excluded)
    pub rows: usize,
    pub filled: usize,
    pub skipped_existing: usize,
    pub skipped_empty_primary: usize,
    pub not_found: usize,
    /// Provider search calls issued for this sheet
    pub searches: u64,
}

impl SheetReport {
    #[must_use]
    pub fn new(sheet: impl Into<String>, rows: usize) -> Self {
        Self {
            sheet: sheet.into(),
            rows,
            ..Self::default()
        }
    }

    pub fn record(&mut self, resolution: &RowResolution) {
        self.searches += u64::from(resolution.searches);
        match resolution.outcome {
            ResolutionOutcome::Filled { .. } => self.filled += 1,
            ResolutionOutcome::Skipped {
                reason: SkipReason::AlreadyFilled,
            } => self.skipped_existing += 1,
            ResolutionOutcome::Skipped {
                reason: SkipReason::EmptyPrimaryField,
            } => self.skipped_empty_primary += 1,
            ResolutionOutcome::NotFound => self.not_found += 1,
        }
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped_existing + self.skipped_empty_primary
    }
}

/// Summary of one full pass over every sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub sheets: Vec<SheetReport>,
    pub output: Option<PathBuf>,
}

impl PassReport {
    #[must_use]
    pub fn total_filled(&self) -> usize {
        self.sheets.iter().map(|s| s.filled).sum()
    }

    #[must_use]
    pub fn total_skipped(&self) -> usize {
        self.sheets.iter().map(SheetReport::skipped).sum()
    }

    #[must_use]
    pub fn total_not_found(&self) -> usize {
        self.sheets.iter().map(|s| s.not_found).sum()
    }

    #[must_use]
    pub fn total_searches(&self) -> u64 {
        self.sheets.iter().map(|s| s.searches).sum()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for sheet in &self.sheets {
            writeln!(
                f,
                "Sheet '{}' ({} rows): filled {}, skipped {} (existing {}, empty primary {}), not found {}",
                sheet.sheet,
                sheet.rows,
                sheet.filled,
                sheet.skipped(),
                sheet.skipped_existing,
                sheet.skipped_empty_primary,
                sheet.not_found,
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Total filled:    {}", self.total_filled())?;
        writeln!(f, "Total skipped:   {}", self.total_skipped())?;
        writeln!(f, "Total not found: {}", self.total_not_found())?;
        if let Some(output) = &self.output {
            write!(f, "Saved as:        {}", output.display())?;
        }
        Ok(())
    }
}
