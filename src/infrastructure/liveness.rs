//! HTTP liveness validation for candidate image URLs

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::http_client::HttpClient;
use crate::domain::{HostAllowList, LivenessProbe};

/// Admits http(s) URLs on allowed hosts and treats a HEAD answered with a
/// final status in `200..400` as live.
pub struct HttpLivenessValidator {
    http: HttpClient,
    allow_list: HostAllowList,
}

impl HttpLivenessValidator {
    pub fn new(http: HttpClient, allow_list: HostAllowList) -> Self {
        Self { http, allow_list }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessValidator {
    fn is_admissible(&self, url: &str) -> bool {
        is_web_url(url) && self.allow_list.admits(url)
    }

    async fn is_live(&self, url: &str, timeout: Duration) -> bool {
        match self.http.head_status(url, timeout).await {
            Ok(status) => {
                debug!("HEAD {} -> {}", url, status);
                (200..400).contains(&status.as_u16())
            }
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}

fn is_web_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some())
        .unwrap_or(false)
}
