//! Whole-table pass
//!
//! Visits every sheet, makes sure the primary and target headers exist,
//! resolves each data row and writes filled URLs back. Rows are resolved with
//! up to `concurrency` in flight; all writes go through this single loop.
//! Politeness delays are enforced per provider by the throttled providers the
//! resolver was built with.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::info;

use super::row_resolver::RowResolver;
use crate::domain::{
    PassReport, RowSnapshot, SheetReport, StoreError, StoreResult, TabularStore,
};

/// Which columns the pass reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub primary_header: String,
    pub target_header: String,
    pub auxiliary_headers: Vec<String>,
    /// Rows resolved concurrently; 1 processes rows strictly one after another
    pub concurrency: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            primary_header: "Title".to_string(),
            target_header: "Image".to_string(),
            auxiliary_headers: vec!["Brand".to_string(), "Region".to_string()],
            concurrency: 1,
        }
    }
}

pub struct TableOrchestrator {
    resolver: RowResolver,
    settings: OrchestratorSettings,
}

impl TableOrchestrator {
    pub fn new(resolver: RowResolver, settings: OrchestratorSettings) -> Self {
        Self { resolver, settings }
    }

    /// Runs one pass over every sheet and saves the store once at the end.
    ///
    /// Only store failures abort the pass; search and probe failures are
    /// already absorbed by the resolver as "no candidate".
    pub async fn run<S>(&self, store: &mut S) -> StoreResult<PassReport>
    where
        S: TabularStore + ?Sized,
    {
        info!(
            "Filling '{}' from '{}' using {}",
            self.settings.target_header,
            self.settings.primary_header,
            self.resolver.provider_names().join(", ")
        );

        let mut report = PassReport::default();
        for sheet in store.sheets() {
            let sheet_report = self.process_sheet(store, &sheet).await?;
            info!(
                "Sheet '{}': filled {}, skipped {}, not found {}",
                sheet_report.sheet,
                sheet_report.filled,
                sheet_report.skipped(),
                sheet_report.not_found
            );
            report.sheets.push(sheet_report);
        }

        report.output = store.save()?;
        Ok(report)
    }

    async fn process_sheet<S>(&self, store: &mut S, sheet: &str) -> StoreResult<SheetReport>
    where
        S: TabularStore + ?Sized,
    {
        let headers = store.ensure_headers(
            sheet,
            &[
                self.settings.primary_header.as_str(),
                self.settings.target_header.as_str(),
            ],
        )?;
        let primary_col = column_of(&headers, sheet, &self.settings.primary_header)?;
        let target_col = column_of(&headers, sheet, &self.settings.target_header)?;
        let auxiliary_cols: Vec<(&str, usize)> = self
            .settings
            .auxiliary_headers
            .iter()
            .filter_map(|name| headers.get(name).map(|&col| (name.as_str(), col)))
            .collect();

        let last_row = store.row_count(sheet)?;
        let mut report = SheetReport::new(sheet, last_row.saturating_sub(1));
        info!("Sheet '{}': {} data rows", sheet, report.rows);

        let snapshots = (2..=last_row)
            .map(|row| read_row(&*store, sheet, row, primary_col, target_col, &auxiliary_cols))
            .collect::<StoreResult<Vec<_>>>()?;

        let resolver = &self.resolver;
        let mut resolutions = stream::iter(&snapshots)
            .map(|snapshot| resolver.resolve(snapshot))
            .buffered(self.settings.concurrency.max(1));

        while let Some(resolution) = resolutions.next().await {
            if let Some(url) = resolution.outcome.filled_url() {
                store.set_cell(sheet, resolution.row, target_col, url)?;
            }
            report.record(&resolution);
        }

        Ok(report)
    }
}

fn column_of(headers: &HashMap<String, usize>, sheet: &str, name: &str) -> StoreResult<usize> {
    headers
        .get(name)
        .copied()
        .ok_or_else(|| StoreError::MissingHeader {
            sheet: sheet.to_string(),
            header: name.to_string(),
        })
}

fn read_row<S>(
    store: &S,
    sheet: &str,
    row: usize,
    primary_col: usize,
    target_col: usize,
    auxiliary_cols: &[(&str, usize)],
) -> StoreResult<RowSnapshot>
where
    S: TabularStore + ?Sized,
{
    let mut auxiliary = Vec::with_capacity(auxiliary_cols.len());
    for &(name, col) in auxiliary_cols {
        auxiliary.push((name.to_string(), store.get_cell(sheet, row, col)?));
    }

    Ok(RowSnapshot {
        sheet: sheet.to_string(),
        row,
        primary: store.get_cell(sheet, row, primary_col)?,
        target: store.get_cell(sheet, row, target_col)?,
        auxiliary,
    })
}
