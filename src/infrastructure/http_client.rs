//! Shared HTTP client for search providers and liveness probes
//!
//! One reqwest connection pool backs every outbound call. Search GETs get a
//! single quota retry: an HTTP 429 waits for `Retry-After` (or the configured
//! backoff) and the request is sent once more.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::config::{SearchConfig, defaults};
use super::search_error::{SearchError, SearchResult};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Wait before retrying a 429 when the server sends no usable Retry-After
    pub quota_backoff: Duration,
    /// Upper bound for any Retry-After the server asks for
    pub max_quota_backoff: Duration,
}

impl HttpClientConfig {
    pub fn from_search_config(search: &SearchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(search.request_timeout_seconds),
            user_agent: search.user_agent.clone(),
            quota_backoff: Duration::from_millis(search.quota_backoff_ms),
            max_quota_backoff: Duration::from_millis(defaults::MAX_QUOTA_BACKOFF_MS),
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_search_config(&SearchConfig::default())
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn with_config(config: HttpClientConfig) -> SearchResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `url`, retrying exactly once after an HTTP 429.
    ///
    /// Any other non-success status is returned as [`SearchError::HttpStatus`].
    pub async fn get_with_quota_retry(&self, url: Url) -> SearchResult<Response> {
        debug!("HTTP GET: {}", redacted(&url));
        let response = self.client.get(url.clone()).send().await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return check_status(response, &url);
        }

        let wait = self.quota_wait(&response);
        warn!(
            "Rate limited by {}, retrying once in {:?}",
            url.host_str().unwrap_or("?"),
            wait
        );
        tokio::time::sleep(wait).await;

        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited {
                url: redacted(&url),
            });
        }
        check_status(response, &url)
    }

    pub async fn get_text(&self, url: Url) -> SearchResult<String> {
        let response = self.get_with_quota_retry(url).await?;
        Ok(response.text().await?)
    }

    /// HEAD `url` following redirects, bounded by `timeout`.
    pub async fn head_status(&self, url: &str, timeout: Duration) -> SearchResult<StatusCode> {
        let response = self.client.head(url).timeout(timeout).send().await?;
        Ok(response.status())
    }

    fn quota_wait(&self, response: &Response) -> Duration {
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.config.quota_backoff)
            .min(self.config.max_quota_backoff)
    }
}

fn check_status(response: Response, url: &Url) -> SearchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    info!("HTTP error {}: {}", status, redacted(url));
    Err(SearchError::HttpStatus {
        status: status.as_u16(),
        url: redacted(url),
    })
}

/// Renders a URL with its `key` query parameter masked so API keys never
/// reach logs or error messages.
pub fn redacted(url: &Url) -> String {
    if !url.query_pairs().any(|(name, _)| name == "key") {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == "key" { "***".to_string() } else { value.into_owned() };
            (name.into_owned(), value)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_masked() {
        let url = Url::parse("https://api.test/v1?key=SECRET&q=red+mug").unwrap();
        let shown = redacted(&url);
        assert!(!shown.contains("SECRET"));
        assert!(shown.contains("key=***") || shown.contains("key=%2A%2A%2A"));
        assert!(shown.contains("q=red"));
    }

    #[test]
    fn urls_without_keys_are_unchanged() {
        let url = Url::parse("https://www.bing.com/images/search?q=mug&first=1").unwrap();
        assert_eq!(redacted(&url), url.to_string());
    }
}
