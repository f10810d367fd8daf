//! Bing Images page scrape.
//!
//! No key is needed. Candidates come from the `m` metadata attribute of
//! `a.iusc` result anchors (its `murl` field), followed by any `<img>` whose
//! source looks like a direct image link.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::domain::{Candidate, Query, SearchProvider};
use crate::infrastructure::config::BingConfig;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::search_error::{SearchError, SearchResult};

pub const NAME: &str = "bing";
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

static MURL_FIELD: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r#""murl":"([^"]+)""#).ok());

pub struct BingImageProvider {
    http: HttpClient,
    settings: BingConfig,
}

impl BingImageProvider {
    pub fn new(http: HttpClient, settings: BingConfig) -> Self {
        Self { http, settings }
    }

    pub fn request_url(&self, query: &Query, first: u32) -> SearchResult<Url> {
        let first = first.to_string();
        Ok(Url::parse_with_params(
            &self.settings.endpoint,
            &[
                ("q", query.as_str()),
                ("form", "HDRSC2"),
                ("first", first.as_str()),
                ("mkt", self.settings.market.as_str()),
            ],
        )?)
    }

    async fn fetch(&self, query: &Query, first: u32) -> SearchResult<Vec<String>> {
        let url = self.request_url(query, first)?;
        let body = self.http.get_text(url).await?;
        parse_results(&body)
    }
}

#[async_trait]
impl SearchProvider for BingImageProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn page_cursors(&self) -> &[u32] {
        &self.settings.first_offsets
    }

    async fn search(&self, query: &Query, cursor: u32) -> Vec<Candidate> {
        match self.fetch(query, cursor).await {
            Ok(urls) => {
                debug!("bing first={} '{}': {} candidates", cursor, query, urls.len());
                Candidate::ranked(urls, NAME, cursor)
            }
            Err(e) => {
                warn!("bing search failed for '{}' (first={}): {}", query, cursor, e);
                Vec::new()
            }
        }
    }
}

/// Extracts candidate image URLs from a results page in document order,
/// metadata anchors first, without repeats.
pub fn parse_results(html: &str) -> SearchResult<Vec<String>> {
    let anchors = selector("a.iusc")?;
    let images = selector("img")?;
    let document = Html::parse_document(html);

    let mut urls: Vec<String> = document
        .select(&anchors)
        .filter_map(|anchor| anchor.value().attr("m"))
        .filter_map(media_url)
        .collect();

    urls.extend(
        document
            .select(&images)
            .filter_map(|img| {
                img.value()
                    .attr("data-src")
                    .filter(|src| !src.is_empty())
                    .or_else(|| img.value().attr("src"))
            })
            .filter(|src| looks_like_image(src))
            .map(ToString::to_string),
    );

    Ok(crate::domain::candidate::dedupe_urls(urls))
}

/// Reads `murl` from an anchor's metadata, as JSON when it parses and by
/// pattern match otherwise.
fn media_url(metadata: &str) -> Option<String> {
    let url = match serde_json::from_str::<serde_json::Value>(metadata) {
        Ok(value) => value.get("murl")?.as_str()?.to_string(),
        Err(_) => MURL_FIELD
            .as_ref()?
            .captures(metadata)?
            .get(1)?
            .as_str()
            .to_string(),
    };
    url.starts_with("http").then_some(url)
}

fn looks_like_image(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    src.starts_with("http") && IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
}

fn selector(css: &str) -> SearchResult<Selector> {
    Selector::parse(css).map_err(|e| SearchError::parse(format!("selector '{css}': {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a class="iusc" m='{"murl":"https://cdn.shop.test/one.jpg","turl":"https://tse.test/t1"}'>1</a>
          <a class="iusc" m='{murl broken json "murl":"https://img.test/two.png","x":1'>2</a>
          <a class="iusc" m='{"murl":"/relative/three.jpg"}'>3</a>
          <a class="iusc">no metadata</a>
          <a class="other" m='{"murl":"https://ignored.test/x.jpg"}'>x</a>
          <img data-src="https://tse.test/thumb.JPEG?w=200" src="data:image/gif;base64,R0lG">
          <img src="https://cdn.shop.test/one.jpg">
          <img src="https://tse.test/th?id=abc">
          <img src="//cdn.test/protocol-relative.png">
        </body></html>
    "#;

    #[test]
    fn metadata_anchors_come_first_then_images() {
        let urls = parse_results(PAGE).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://cdn.shop.test/one.jpg".to_string(),
                "https://img.test/two.png".to_string(),
                "https://tse.test/thumb.JPEG?w=200".to_string(),
            ]
        );
    }

    #[test]
    fn empty_page_has_no_candidates() {
        assert!(parse_results("<html></html>").unwrap().is_empty());
    }

    #[test]
    fn request_url_carries_offset_and_market() {
        let http = HttpClient::with_config(Default::default()).unwrap();
        let provider = BingImageProvider::new(http, BingConfig::default());
        let url = provider
            .request_url(&Query::build::<&str>("Visa Gift Card", &[]), 11)
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".into(), "Visa Gift Card".into())));
        assert!(pairs.contains(&("first".into(), "11".into())));
        assert!(pairs.contains(&("mkt".into(), "en-US".into())));
        assert_eq!(provider.page_cursors(), &[1, 11]);
    }
}
