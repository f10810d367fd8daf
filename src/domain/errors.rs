//! Fatal error types
//!
//! Configuration and workbook failures abort a pass before (or instead of)
//! touching any row. Per-call search failures live in
//! `infrastructure::search_error` and never reach this level.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Input workbook not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Missing credential '{key}' for provider {provider}. Provide it via CLI/config, environment, key file or prompt")]
    MissingCredential { key: String, provider: String },

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("Failed to load configuration file {}: {message}", path.display())]
    ConfigFile { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn missing_credential(key: &str, provider: &str) -> Self {
        Self::MissingCredential {
            key: key.to_string(),
            provider: provider.to_string(),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sheet '{0}' does not exist")]
    UnknownSheet(String),

    #[error("Header '{header}' missing on sheet '{sheet}'")]
    MissingHeader { sheet: String, header: String },

    #[error("Cell address out of range: row {row}, column {column} (indices start at 1)")]
    InvalidAddress { row: usize, column: usize },

    #[error("Failed to read workbook {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to write workbook {}: {message}", path.display())]
    Write { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
