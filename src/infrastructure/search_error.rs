//! Per-call search failures
//!
//! These never escape a provider: each is logged and collapsed into an empty
//! candidate list so the resolver simply moves on to the next option.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {message}")]
    Request { message: String, timeout: bool },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Rate limit still exceeded after backoff: {url}")]
    RateLimited { url: String },

    #[error("Failed to parse provider response: {message}")]
    Parse { message: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SearchError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether the same call could plausibly succeed later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } | Self::RateLimited { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 408,
            Self::Parse { .. } | Self::InvalidUrl(_) => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request {
            timeout: error.is_timeout(),
            message: error.to_string(),
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
