//! Search provider implementations and the factory that assembles them.

pub mod bing;
pub mod google_cse;
pub mod pixabay;

pub use bing::BingImageProvider;
pub use google_cse::GoogleCseProvider;
pub use pixabay::PixabayProvider;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::config::{AppConfig, ProviderKind};
use super::credentials::ProviderCredentials;
use super::http_client::HttpClient;
use super::throttle::ThrottledProvider;
use crate::domain::{ConfigError, SearchProvider};

/// Builds the configured providers in priority order, each behind its own
/// politeness throttle. A provider listed twice is only built once.
pub fn build_providers(
    config: &AppConfig,
    credentials: &ProviderCredentials,
    http: &HttpClient,
) -> Result<Vec<Arc<dyn SearchProvider>>, ConfigError> {
    let delay = Duration::from_millis(config.search.delay_between_queries_ms);
    let mut seen = Vec::new();
    let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();

    for &kind in &config.search.providers {
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);

        let provider: Arc<dyn SearchProvider> = match kind {
            ProviderKind::Bing => Arc::new(ThrottledProvider::new(
                BingImageProvider::new(http.clone(), config.bing.clone()),
                delay,
            )),
            ProviderKind::Google => {
                let google = credentials
                    .google
                    .clone()
                    .ok_or_else(|| ConfigError::missing_credential("GOOGLE_CSE_KEY", kind.as_str()))?;
                Arc::new(ThrottledProvider::new(
                    GoogleCseProvider::new(http.clone(), google, config.google.clone()),
                    delay,
                ))
            }
            ProviderKind::Pixabay => {
                let api_key = credentials
                    .pixabay
                    .clone()
                    .ok_or_else(|| ConfigError::missing_credential("PIXABAY_API_KEY", kind.as_str()))?;
                Arc::new(ThrottledProvider::new(
                    PixabayProvider::new(http.clone(), api_key, config.pixabay.clone()),
                    delay,
                ))
            }
        };
        providers.push(provider);
    }

    info!(
        "Search providers: {}",
        providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(" -> ")
    );
    Ok(providers)
}
