//! # Search Query Value Object
//!
//! Builds the single search string used for one row: the primary field
//! followed by any present auxiliary fields, with repeated words removed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Immutable, whitespace-normalized search query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query(String);

impl Query {
    /// Builds a query from the primary value and the auxiliary `(field, value)` pairs.
    ///
    /// Blank auxiliary values are ignored. Words are compared case-insensitively;
    /// the first occurrence keeps its casing and position.
    #[must_use]
    pub fn build<S: AsRef<str>>(primary: &str, auxiliary: &[(S, Option<String>)]) -> Self {
        let mut parts = vec![primary.trim()];
        parts.extend(
            auxiliary
                .iter()
                .filter_map(|(_, value)| value.as_deref())
                .map(str::trim)
                .filter(|value| !value.is_empty()),
        );

        Self(dedupe_words(&parts.join(" ")))
    }

    /// Returns the query text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Removes repeated words (case-insensitive) while preserving first-seen order.
///
/// `"Aeropostale India india Global"` becomes `"Aeropostale India Global"`.
#[must_use]
pub fn dedupe_words(text: &str) -> String {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|word| seen.insert(word.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}
