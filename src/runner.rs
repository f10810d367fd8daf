//! Wires configuration into a ready-to-run pass.
//!
//! Everything that can fail before a row is touched (validation, input
//! presence, credentials, HTTP client setup, workbook open) happens here, so
//! a misconfigured run aborts without producing an output file.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::{OrchestratorSettings, ResolverSettings, RowResolver, TableOrchestrator};
use crate::domain::{ConfigError, HostAllowList, LivenessProbe, PassReport};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credentials::CredentialResolver;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};
use crate::infrastructure::liveness::HttpLivenessValidator;
use crate::infrastructure::providers::build_providers;
use crate::infrastructure::workbook::Workbook;

pub fn orchestrator_settings(config: &AppConfig) -> OrchestratorSettings {
    OrchestratorSettings {
        primary_header: config.workbook.primary_header.trim().to_string(),
        target_header: config.workbook.target_header.trim().to_string(),
        auxiliary_headers: config
            .workbook
            .auxiliary_headers
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        concurrency: config.search.concurrency,
    }
}

pub fn resolver_settings(config: &AppConfig) -> ResolverSettings {
    ResolverSettings {
        probe_timeout: Duration::from_secs(config.search.probe_timeout_seconds),
        max_searches_per_row: config.search.max_searches_per_row,
    }
}

/// Builds the orchestrator from configuration, resolving credentials with
/// `credentials`.
pub fn build_orchestrator(config: &AppConfig, credentials: &CredentialResolver) -> Result<TableOrchestrator> {
    let keys = credentials.resolve_for(config)?;

    let http = HttpClient::with_config(HttpClientConfig::from_search_config(&config.search))
        .context("Failed to create HTTP client")?;
    let providers = build_providers(config, &keys, &http)?;

    let allow_list = HostAllowList::new(&config.search.allowed_domains);
    if !allow_list.is_empty() {
        info!("Allowed image hosts: {}", allow_list.domains().join(", "));
    }
    let probe: Arc<dyn LivenessProbe> = Arc::new(HttpLivenessValidator::new(http, allow_list));

    let resolver = RowResolver::new(providers, probe, resolver_settings(config));
    Ok(TableOrchestrator::new(resolver, orchestrator_settings(config)))
}

/// One complete pass: validate, resolve credentials, open the input, fill,
/// save.
pub async fn run(config: &AppConfig) -> Result<PassReport> {
    config.validate()?;

    let input = &config.workbook.input;
    if !input.is_file() {
        return Err(ConfigError::InputNotFound {
            path: input.clone(),
        }
        .into());
    }

    let orchestrator = build_orchestrator(config, &CredentialResolver::new(&config.credentials))?;

    let output = config.workbook.output_path();
    let mut workbook = Workbook::open(input)
        .with_context(|| format!("Cannot open input workbook {}", input.display()))?
        .with_output(&output);

    let report = orchestrator
        .run(&mut workbook)
        .await
        .with_context(|| format!("Pass over {} failed", input.display()))?;

    info!(
        "Done: filled {}, skipped {}, not found {} ({} searches)",
        report.total_filled(),
        report.total_skipped(),
        report.total_not_found(),
        report.total_searches()
    );
    Ok(report)
}
