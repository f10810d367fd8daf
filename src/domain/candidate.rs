//! Candidate image URLs proposed by a search provider

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Where a candidate came from: provider, page cursor and rank within that page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CandidateSource {
    pub provider: &'static str,
    pub cursor: u32,
    pub rank: usize,
}

/// A URL proposed by a provider as a possible image for a row's query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Candidate {
    pub url: String,
    pub source: CandidateSource,
}

impl Candidate {
    #[must_use]
    pub fn new(url: String, provider: &'static str, cursor: u32, rank: usize) -> Self {
        Self {
            url,
            source: CandidateSource {
                provider,
                cursor,
                rank,
            },
        }
    }

    /// Wraps an ordered URL list from one provider call, dropping repeats.
    #[must_use]
    pub fn ranked(urls: Vec<String>, provider: &'static str, cursor: u32) -> Vec<Self> {
        dedupe_urls(urls)
            .into_iter()
            .enumerate()
            .map(|(rank, url)| Self::new(url, provider, cursor, rank))
            .collect()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} cursor {}, rank {})",
            self.url, self.source.provider, self.source.cursor, self.source.rank
        )
    }
}

/// Drops repeated URLs, keeping the first occurrence in place.
#[must_use]
pub fn dedupe_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
