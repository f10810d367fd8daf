//! Configuration infrastructure
//!
//! Settings are organized by concern:
//! 1. Workbook locations and column names
//! 2. Search behaviour shared by every provider (order, throttling, timeouts)
//! 3. Per-provider request parameters and optional explicit credentials
//! 4. Credential lookup and logging
//!
//! Every section deserializes with defaults, so a config file only needs the
//! keys it wants to change.

#![allow(clippy::derivable_impls)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use url::Url;

use crate::domain::ConfigError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub workbook: WorkbookConfig,
    pub search: SearchConfig,
    pub bing: BingConfig,
    pub google: GoogleConfig,
    pub pixabay: PixabayConfig,
    pub credentials: CredentialConfig,
    pub logging: LoggingConfig,
}

/// Supported search backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Bing Images page scrape (no key required)
    Bing,
    /// Google Custom Search JSON API in image mode
    Google,
    /// Pixabay image API
    Pixabay,
}

impl ProviderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bing => "bing",
            Self::Google => "google",
            Self::Pixabay => "pixabay",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workbook locations and the columns the pass reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    pub input: PathBuf,
    /// Defaults to `<input stem>_with_images.xlsx` next to the input
    pub output: Option<PathBuf>,
    pub primary_header: String,
    pub target_header: String,
    /// Extra columns appended to the query when present on a sheet
    pub auxiliary_headers: Vec<String>,
}

/// Settings shared by every provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers in priority order
    pub providers: Vec<ProviderKind>,
    /// Hosts (and their subdomains) accepted for results; empty accepts all
    pub allowed_domains: Vec<String>,
    /// Minimum spacing between two calls to the same provider
    pub delay_between_queries_ms: u64,
    pub request_timeout_seconds: u64,
    pub probe_timeout_seconds: u64,
    pub user_agent: String,
    /// Wait before the single retry after an HTTP 429
    pub quota_backoff_ms: u64,
    /// Cap on provider searches per row; unset means unlimited
    pub max_searches_per_row: Option<u32>,
    /// Rows resolved concurrently
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BingConfig {
    pub endpoint: String,
    /// Values of the `first` result-offset parameter, tried in order
    pub first_offsets: Vec<u32>,
    pub market: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub cx: Option<String>,
    pub safe: String,
    pub img_size: String,
    pub results_per_query: u32,
    /// Values of the 1-based `start` parameter, tried in order
    pub start_indices: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PixabayConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub image_type: String,
    pub safesearch: bool,
    pub per_page: u32,
    /// Page numbers, tried in order
    pub pages: Vec<u32>,
    pub lang: String,
    pub orientation: String,
    pub order: String,
    pub min_width: u32,
    pub min_height: u32,
}

/// Where credentials are looked up after explicit values and environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Directory holding `google.key`, `google.cx`, `pixabay.key`
    pub key_dir: PathBuf,
    /// Prompt for anything still missing (only honoured on a terminal)
    pub interactive: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Defaults to `./logs`
    pub log_dir: Option<PathBuf>,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(defaults::INPUT_WORKBOOK),
            output: None,
            primary_header: defaults::PRIMARY_HEADER.to_string(),
            target_header: defaults::TARGET_HEADER.to_string(),
            auxiliary_headers: defaults::AUXILIARY_HEADERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: vec![ProviderKind::Bing],
            allowed_domains: Vec::new(),
            delay_between_queries_ms: defaults::DELAY_BETWEEN_QUERIES_MS,
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            probe_timeout_seconds: defaults::PROBE_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            quota_backoff_ms: defaults::QUOTA_BACKOFF_MS,
            max_searches_per_row: None,
            concurrency: defaults::CONCURRENCY,
        }
    }
}

impl Default for BingConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::BING_ENDPOINT.to_string(),
            first_offsets: defaults::BING_FIRST_OFFSETS.to_vec(),
            market: defaults::BING_MARKET.to_string(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::GOOGLE_ENDPOINT.to_string(),
            api_key: None,
            cx: None,
            safe: defaults::GOOGLE_SAFE.to_string(),
            img_size: defaults::GOOGLE_IMG_SIZE.to_string(),
            results_per_query: defaults::GOOGLE_RESULTS_PER_QUERY,
            start_indices: vec![1],
        }
    }
}

impl Default for PixabayConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::PIXABAY_ENDPOINT.to_string(),
            api_key: None,
            image_type: "photo".to_string(),
            safesearch: true,
            per_page: defaults::PIXABAY_PER_PAGE,
            pages: vec![1],
            lang: "en".to_string(),
            orientation: "horizontal".to_string(),
            order: "popular".to_string(),
            min_width: defaults::PIXABAY_MIN_DIMENSION,
            min_height: defaults::PIXABAY_MIN_DIMENSION,
        }
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("."),
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
        }
    }
}

impl WorkbookConfig {
    /// Output path, derived from the input when not configured
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self
                .input
                .file_stem()
                .map_or_else(|| "workbook".into(), |s| s.to_string_lossy());
            self.input.with_file_name(format!("{stem}_with_images.xlsx"))
        })
    }
}

impl AppConfig {
    /// Checks values that would otherwise fail mid-pass
    pub fn validate(&self) -> Result<(), ConfigError> {
        let workbook = &self.workbook;
        if workbook.primary_header.trim().is_empty() {
            return Err(ConfigError::invalid("workbook.primary_header", "must not be empty"));
        }
        if workbook.target_header.trim().is_empty() {
            return Err(ConfigError::invalid("workbook.target_header", "must not be empty"));
        }
        if workbook.primary_header.trim() == workbook.target_header.trim() {
            return Err(ConfigError::invalid(
                "workbook.target_header",
                "must differ from the primary header",
            ));
        }
        if self.search.providers.is_empty() {
            return Err(ConfigError::invalid("search.providers", "select at least one provider"));
        }
        if self.search.concurrency == 0 {
            return Err(ConfigError::invalid("search.concurrency", "must be at least 1"));
        }
        if self.search.request_timeout_seconds == 0 || self.search.probe_timeout_seconds == 0 {
            return Err(ConfigError::invalid("search timeouts", "must be greater than 0"));
        }
        for kind in &self.search.providers {
            let (endpoint, cursors) = match kind {
                ProviderKind::Bing => (&self.bing.endpoint, &self.bing.first_offsets),
                ProviderKind::Google => (&self.google.endpoint, &self.google.start_indices),
                ProviderKind::Pixabay => (&self.pixabay.endpoint, &self.pixabay.pages),
            };
            if let Err(e) = Url::parse(endpoint) {
                return Err(ConfigError::invalid(
                    kind.as_str(),
                    format!("endpoint '{endpoint}' is not a URL: {e}"),
                ));
            }
            if cursors.is_empty() {
                return Err(ConfigError::invalid(
                    kind.as_str(),
                    "needs at least one page cursor",
                ));
            }
        }
        Ok(())
    }
}

/// Locates and loads the configuration file
pub struct ConfigManager {
    pub config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Per-user configuration file location
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sheet-image-fill").join("config.json"))
    }

    /// Uses `explicit` when given, otherwise the first existing of
    /// `./sheet-image-fill.json` and the per-user config file.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let config_path = explicit.or_else(|| {
            std::iter::once(PathBuf::from(defaults::LOCAL_CONFIG_FILE))
                .chain(Self::user_config_path())
                .find(|path| path.exists())
        });
        Self { config_path }
    }

    /// The file `load_config` reads, if any
    pub fn loaded_from(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Loads the located file, or built-in defaults when there is none
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        match &self.config_path {
            Some(path) => Self::read_file(path),
            None => Ok(AppConfig::default()),
        }
    }

    fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
        let failure = |message: String| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| failure(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| failure(e.to_string()))
    }
}

/// Default configuration values
pub mod defaults {
    pub const INPUT_WORKBOOK: &str = "products_for_auto_images_ALL_SHEETS.xlsx";
    pub const LOCAL_CONFIG_FILE: &str = "sheet-image-fill.json";

    pub const PRIMARY_HEADER: &str = "Title";
    pub const TARGET_HEADER: &str = "Image";
    pub const AUXILIARY_HEADERS: &[&str] = &["Brand", "Region"];

    pub const DELAY_BETWEEN_QUERIES_MS: u64 = 600;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 20;
    pub const PROBE_TIMEOUT_SECONDS: u64 = 10;
    pub const QUOTA_BACKOFF_MS: u64 = 2000;
    /// Upper bound on any server-requested Retry-After wait
    pub const MAX_QUOTA_BACKOFF_MS: u64 = 30_000;
    pub const CONCURRENCY: usize = 1;
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

    pub const BING_ENDPOINT: &str = "https://www.bing.com/images/search";
    pub const BING_FIRST_OFFSETS: &[u32] = &[1, 11];
    pub const BING_MARKET: &str = "en-US";

    pub const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
    pub const GOOGLE_SAFE: &str = "active";
    pub const GOOGLE_IMG_SIZE: &str = "large";
    pub const GOOGLE_RESULTS_PER_QUERY: u32 = 10;

    pub const PIXABAY_ENDPOINT: &str = "https://pixabay.com/api/";
    pub const PIXABAY_PER_PAGE: u32 = 10;
    pub const PIXABAY_MIN_DIMENSION: u32 = 600;

    pub const LOG_LEVEL: &str = "info";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.providers, vec![ProviderKind::Bing]);
        assert_eq!(config.bing.first_offsets, vec![1, 11]);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"search": {{"providers": ["pixabay", "google"], "allowed_domains": ["pixabay.com"]}},
                "workbook": {{"input": "cards.xlsx"}}}}"#
        )
        .unwrap();

        let manager = ConfigManager::new(Some(file.path().to_path_buf()));
        assert_eq!(manager.loaded_from(), Some(file.path()));
        let config = manager.load_config().unwrap();

        assert_eq!(
            config.search.providers,
            vec![ProviderKind::Pixabay, ProviderKind::Google]
        );
        assert_eq!(config.search.delay_between_queries_ms, 600);
        assert_eq!(config.workbook.target_header, "Image");
        assert_eq!(config.workbook.output_path(), PathBuf::from("cards_with_images.xlsx"));
        assert_eq!(config.pixabay.endpoint, defaults::PIXABAY_ENDPOINT);
    }

    #[test]
    fn provider_endpoints_can_be_overridden() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"search": {{"providers": ["google"]}},
                "google": {{"endpoint": "http://127.0.0.1:8080/customsearch/v1"}}}}"#
        )
        .unwrap();

        let config = ConfigManager::new(Some(file.path().to_path_buf()))
            .load_config()
            .unwrap();
        assert_eq!(config.google.endpoint, "http://127.0.0.1:8080/customsearch/v1");
        assert_eq!(config.google.start_indices, vec![1]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn selected_provider_with_unparsable_endpoint_is_rejected() {
        let mut config = AppConfig::default();
        config.bing.endpoint = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig { .. })
        ));

        config.search.providers = vec![ProviderKind::Pixabay];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = ConfigManager::new(Some(file.path().to_path_buf()))
            .load_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConfigFile { .. }));
    }

    #[test]
    fn same_primary_and_target_header_is_rejected() {
        let mut config = AppConfig::default();
        config.workbook.target_header = "Title".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig { .. })
        ));
    }
}
