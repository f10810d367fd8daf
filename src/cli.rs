//! Command-line interface.
//!
//! Every flag overrides the matching configuration value; anything not given
//! on the command line comes from the config file or built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::infrastructure::config::{AppConfig, ProviderKind};

#[derive(Debug, Parser)]
#[command(name = "fill-images")]
#[command(version, about = "Fill missing image URLs in every sheet of a workbook")]
pub struct Cli {
    /// Workbook to read
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Where to save the filled workbook [default: <input>_with_images.xlsx]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Search provider; repeat to fall back in the given order
    #[arg(short, long = "provider", value_enum)]
    pub providers: Vec<ProviderKind>,

    /// Google Custom Search API key [also: $GOOGLE_CSE_KEY, google.key]
    #[arg(long)]
    pub google_key: Option<String>,

    /// Google Programmable Search engine id [also: $GOOGLE_CSE_CX, google.cx]
    #[arg(long)]
    pub google_cx: Option<String>,

    /// Pixabay API key [also: $PIXABAY_API_KEY, pixabay.key]
    #[arg(long)]
    pub pixabay_key: Option<String>,

    /// Only accept images hosted on this domain or its subdomains; repeatable
    #[arg(long = "allow-domain")]
    pub allowed_domains: Vec<String>,

    /// Minimum delay between two searches on the same provider
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Rows resolved concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Stop searching a row after this many provider calls
    #[arg(long)]
    pub max_searches_per_row: Option<u32>,

    /// Never prompt for missing credentials
    #[arg(long)]
    pub no_prompt: bool,

    /// error, warn, info, debug or trace
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print the pass summary as JSON on stdout
    #[arg(long)]
    pub json_summary: bool,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(input) = &self.input {
            config.workbook.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.workbook.output = Some(output.clone());
        }
        if !self.providers.is_empty() {
            config.search.providers = self.providers.clone();
        }
        if let Some(key) = &self.google_key {
            config.google.api_key = Some(key.clone());
        }
        if let Some(cx) = &self.google_cx {
            config.google.cx = Some(cx.clone());
        }
        if let Some(key) = &self.pixabay_key {
            config.pixabay.api_key = Some(key.clone());
        }
        if !self.allowed_domains.is_empty() {
            config.search.allowed_domains = self.allowed_domains.clone();
        }
        if let Some(delay) = self.delay_ms {
            config.search.delay_between_queries_ms = delay;
        }
        if let Some(concurrency) = self.concurrency {
            config.search.concurrency = concurrency;
        }
        if let Some(cap) = self.max_searches_per_row {
            config.search.max_searches_per_row = Some(cap);
        }
        if self.no_prompt {
            config.credentials.interactive = false;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
