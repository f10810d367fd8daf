//! Per-row resolution
//!
//! Walks `providers × page cursors × candidates` in priority order and stops
//! at the first candidate that is both admissible and live.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{
    LivenessProbe, Query, ResolutionOutcome, RowResolution, RowSnapshot, SearchProvider,
    SkipReason,
};

/// Tunables for [`RowResolver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    pub probe_timeout: Duration,
    /// Upper bound on provider search calls per row; `None` means unlimited
    pub max_searches_per_row: Option<u32>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            max_searches_per_row: None,
        }
    }
}

/// Resolves one row to at most one image URL
pub struct RowResolver {
    providers: Vec<Arc<dyn SearchProvider>>,
    probe: Arc<dyn LivenessProbe>,
    settings: ResolverSettings,
}

impl RowResolver {
    /// Providers are tried in the given order
    pub fn new(
        providers: Vec<Arc<dyn SearchProvider>>,
        probe: Arc<dyn LivenessProbe>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            providers,
            probe,
            settings,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn resolve(&self, row: &RowSnapshot) -> RowResolution {
        let resolved = |outcome, searches| RowResolution {
            row: row.row,
            outcome,
            searches,
        };

        if row.has_target_value() {
            return resolved(
                ResolutionOutcome::Skipped {
                    reason: SkipReason::AlreadyFilled,
                },
                0,
            );
        }

        let Some(primary) = row.primary_text() else {
            return resolved(
                ResolutionOutcome::Skipped {
                    reason: SkipReason::EmptyPrimaryField,
                },
                0,
            );
        };

        let query = Query::build(primary, &row.auxiliary);
        info!("[{} R{}] image search: {:?}", row.sheet, row.row, query.as_str());

        let mut searches = 0u32;
        for provider in &self.providers {
            for &cursor in provider.page_cursors() {
                if self
                    .settings
                    .max_searches_per_row
                    .is_some_and(|cap| searches >= cap)
                {
                    warn!(
                        "[{} R{}] search cap of {} reached, giving up",
                        row.sheet, row.row, searches
                    );
                    return resolved(ResolutionOutcome::NotFound, searches);
                }

                searches += 1;
                let candidates = provider.search(&query, cursor).await;
                debug!(
                    "{} cursor {} returned {} candidates",
                    provider.name(),
                    cursor,
                    candidates.len()
                );

                for candidate in candidates {
                    if !self.probe.is_admissible(candidate.as_str()) {
                        debug!("rejected by allow-list: {}", candidate.url);
                        continue;
                    }
                    if self
                        .probe
                        .is_live(candidate.as_str(), self.settings.probe_timeout)
                        .await
                    {
                        info!("[{} R{}] found {}", row.sheet, row.row, candidate);
                        return resolved(ResolutionOutcome::Filled { candidate }, searches);
                    }
                    debug!("not live: {}", candidate.url);
                }
            }
        }

        info!("[{} R{}] no live image found", row.sheet, row.row);
        resolved(ResolutionOutcome::NotFound, searches)
    }
}
