//! Row snapshots and per-row resolution outcomes

use serde::Serialize;
use std::fmt;

use super::candidate::Candidate;

/// Cell values of one row needed to resolve it, read before resolution starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSnapshot {
    pub sheet: String,
    /// 1-based row index within the sheet (row 1 holds headers)
    pub row: usize,
    pub primary: Option<String>,
    pub target: Option<String>,
    /// Auxiliary `(header, value)` pairs in configured order, only for headers present on the sheet
    pub auxiliary: Vec<(String, Option<String>)>,
}

impl RowSnapshot {
    #[must_use]
    pub fn has_target_value(&self) -> bool {
        is_filled(self.target.as_deref())
    }

    /// Trimmed primary value, `None` when blank
    #[must_use]
    pub fn primary_text(&self) -> Option<&str> {
        self.primary
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Why a row was left untouched without searching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyFilled,
    EmptyPrimaryField,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyFilled => f.write_str("already filled"),
            Self::EmptyPrimaryField => f.write_str("empty primary field"),
        }
    }
}

/// Result of resolving one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Filled { candidate: Candidate },
    Skipped { reason: SkipReason },
    NotFound,
}

impl ResolutionOutcome {
    #[must_use]
    pub fn filled_url(&self) -> Option<&str> {
        match self {
            Self::Filled { candidate } => Some(candidate.as_str()),
            _ => None,
        }
    }
}

/// A row's outcome together with how many provider searches it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResolution {
    pub row: usize,
    pub outcome: ResolutionOutcome,
    pub searches: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(primary: Option<&str>, target: Option<&str>) -> RowSnapshot {
        RowSnapshot {
            sheet: "Sheet1".into(),
            row: 2,
            primary: primary.map(Into::into),
            target: target.map(Into::into),
            auxiliary: Vec::new(),
        }
    }

    #[test]
    fn whitespace_counts_as_blank() {
        let row = snapshot(Some("   "), Some(" \t"));
        assert!(row.primary_text().is_none());
        assert!(!row.has_target_value());
    }

    #[test]
    fn primary_text_is_trimmed() {
        let row = snapshot(Some("  Steam Card "), Some("https://x.test/a.png"));
        assert_eq!(row.primary_text(), Some("Steam Card"));
        assert!(row.has_target_value());
    }
}
