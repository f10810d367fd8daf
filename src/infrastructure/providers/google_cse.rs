//! Google Custom Search JSON API in image mode.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{Candidate, Query, SearchProvider};
use crate::infrastructure::config::GoogleConfig;
use crate::infrastructure::credentials::GoogleCredentials;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::search_error::{SearchError, SearchResult};

pub const NAME: &str = "google";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
}

pub struct GoogleCseProvider {
    http: HttpClient,
    credentials: GoogleCredentials,
    settings: GoogleConfig,
}

impl GoogleCseProvider {
    pub fn new(http: HttpClient, credentials: GoogleCredentials, settings: GoogleConfig) -> Self {
        Self {
            http,
            credentials,
            settings,
        }
    }

    /// `start` is the 1-based index of the first result requested.
    pub fn request_url(&self, query: &Query, start: u32) -> SearchResult<Url> {
        let num = self.settings.results_per_query.clamp(1, 10).to_string();
        let start = start.max(1).to_string();
        Ok(Url::parse_with_params(
            &self.settings.endpoint,
            &[
                ("key", self.credentials.api_key.expose()),
                ("cx", self.credentials.cx.as_str()),
                ("q", query.as_str()),
                ("searchType", "image"),
                ("safe", self.settings.safe.as_str()),
                ("imgSize", self.settings.img_size.as_str()),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ],
        )?)
    }

    async fn fetch(&self, query: &Query, start: u32) -> SearchResult<Vec<String>> {
        let url = self.request_url(query, start)?;
        let body = self.http.get_text(url).await?;
        parse_response(&body)
    }
}

#[async_trait]
impl SearchProvider for GoogleCseProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn page_cursors(&self) -> &[u32] {
        &self.settings.start_indices
    }

    async fn search(&self, query: &Query, cursor: u32) -> Vec<Candidate> {
        match self.fetch(query, cursor).await {
            Ok(urls) => {
                debug!("google start={} '{}': {} candidates", cursor, query, urls.len());
                Candidate::ranked(urls, NAME, cursor)
            }
            Err(e) => {
                warn!("google search failed for '{}' (start={}): {}", query, cursor, e);
                Vec::new()
            }
        }
    }
}

/// Image links from a response body, in result order. A body without
/// `items` is a valid empty result.
pub fn parse_response(body: &str) -> SearchResult<Vec<String>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::parse(e.to_string()))?;

    Ok(response
        .items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| item.link)
        .filter(|link| !link.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credentials::ApiKey;

    #[test]
    fn links_are_read_in_order() {
        let body = r#"{
            "kind": "customsearch#search",
            "items": [
                {"link": "https://cdn.shop.test/a.jpg", "mime": "image/jpeg"},
                {"title": "no link"},
                {"link": ""},
                {"link": "https://img.test/b.png"}
            ]
        }"#;

        assert_eq!(
            parse_response(body).unwrap(),
            vec!["https://cdn.shop.test/a.jpg".to_string(), "https://img.test/b.png".to_string()]
        );
    }

    #[test]
    fn missing_or_null_items_is_empty() {
        assert!(parse_response(r#"{"kind": "customsearch#search"}"#).unwrap().is_empty());
        assert!(parse_response(r#"{"items": null}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        assert!(matches!(parse_response("<html>"), Err(SearchError::Parse { .. })));
    }

    #[test]
    fn request_url_uses_image_mode_and_clamps_page_size() {
        let http = HttpClient::with_config(Default::default()).unwrap();
        let settings = GoogleConfig {
            results_per_query: 50,
            ..GoogleConfig::default()
        };
        let credentials = GoogleCredentials {
            api_key: ApiKey::new("k"),
            cx: "engine".into(),
        };
        let provider = GoogleCseProvider::new(http, credentials, settings);
        let url = provider.request_url(&Query::build::<&str>("gift card", &[]), 1).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        for expected in [
            ("searchType", "image"),
            ("safe", "active"),
            ("imgSize", "large"),
            ("num", "10"),
            ("start", "1"),
            ("cx", "engine"),
        ] {
            assert!(
                pairs.contains(&(expected.0.to_string(), expected.1.to_string())),
                "missing {expected:?}"
            );
        }
    }
}
