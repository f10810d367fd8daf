//! Pixabay image API.
//!
//! Each hit contributes its largest available rendition:
//! `largeImageURL`, then `webformatURL`, then `previewURL`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::domain::{Candidate, Query, SearchProvider};
use crate::infrastructure::config::PixabayConfig;
use crate::infrastructure::credentials::ApiKey;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::search_error::{SearchError, SearchResult};

pub const NAME: &str = "pixabay";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Option<Vec<Hit>>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
    #[serde(rename = "previewURL")]
    preview_url: Option<String>,
}

impl Hit {
    fn best_url(self) -> Option<String> {
        [self.large_image_url, self.webformat_url, self.preview_url]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty())
    }
}

pub struct PixabayProvider {
    http: HttpClient,
    api_key: ApiKey,
    settings: PixabayConfig,
}

impl PixabayProvider {
    pub fn new(http: HttpClient, api_key: ApiKey, settings: PixabayConfig) -> Self {
        Self {
            http,
            api_key,
            settings,
        }
    }

    pub fn request_url(&self, query: &Query, page: u32) -> SearchResult<Url> {
        let settings = &self.settings;
        let safesearch = settings.safesearch.to_string();
        let per_page = settings.per_page.clamp(3, 200).to_string();
        let page = page.max(1).to_string();
        let min_width = settings.min_width.to_string();
        let min_height = settings.min_height.to_string();
        Ok(Url::parse_with_params(
            &self.settings.endpoint,
            &[
                ("key", self.api_key.expose()),
                ("q", query.as_str()),
                ("image_type", settings.image_type.as_str()),
                ("safesearch", safesearch.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
                ("lang", settings.lang.as_str()),
                ("orientation", settings.orientation.as_str()),
                ("order", settings.order.as_str()),
                ("min_width", min_width.as_str()),
                ("min_height", min_height.as_str()),
            ],
        )?)
    }

    async fn fetch(&self, query: &Query, page: u32) -> SearchResult<Vec<String>> {
        let url = self.request_url(query, page)?;
        let body = self.http.get_text(url).await?;
        parse_response(&body)
    }
}

#[async_trait]
impl SearchProvider for PixabayProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn page_cursors(&self) -> &[u32] {
        &self.settings.pages
    }

    async fn search(&self, query: &Query, cursor: u32) -> Vec<Candidate> {
        match self.fetch(query, cursor).await {
            Ok(urls) => {
                debug!("pixabay page={} '{}': {} candidates", cursor, query, urls.len());
                Candidate::ranked(urls, NAME, cursor)
            }
            Err(e) => {
                warn!("pixabay search failed for '{}' (page={}): {}", query, cursor, e);
                Vec::new()
            }
        }
    }
}

pub fn parse_response(body: &str) -> SearchResult<Vec<String>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::parse(e.to_string()))?;

    Ok(response
        .hits
        .unwrap_or_default()
        .into_iter()
        .filter_map(Hit::best_url)
        .collect())
}
