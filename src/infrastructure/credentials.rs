//! Provider credential lookup.
//!
//! Each credential is taken from the first source that yields a non-blank
//! value: explicit (CLI or config file), environment variable, first line of
//! a key file in the configured key directory, then an interactive prompt.
//! Key values are wrapped in [`ApiKey`] so they never show up in logs.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::config::{AppConfig, CredentialConfig, ProviderKind};
use crate::domain::ConfigError;

/// An API key that is redacted in `Debug` and `Display`.
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Only call this when building the outgoing request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Where one credential may be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSpec {
    pub provider: ProviderKind,
    pub name: &'static str,
    pub env_var: &'static str,
    pub file_name: &'static str,
    /// Hide input when prompting
    pub secret: bool,
}

pub const GOOGLE_API_KEY: CredentialSpec = CredentialSpec {
    provider: ProviderKind::Google,
    name: "API key",
    env_var: "GOOGLE_CSE_KEY",
    file_name: "google.key",
    secret: true,
};

pub const GOOGLE_ENGINE_ID: CredentialSpec = CredentialSpec {
    provider: ProviderKind::Google,
    name: "search engine id (cx)",
    env_var: "GOOGLE_CSE_CX",
    file_name: "google.cx",
    secret: false,
};

pub const PIXABAY_API_KEY: CredentialSpec = CredentialSpec {
    provider: ProviderKind::Pixabay,
    name: "API key",
    env_var: "PIXABAY_API_KEY",
    file_name: "pixabay.key",
    secret: true,
};

#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub api_key: ApiKey,
    pub cx: String,
}

/// Credentials for the selected providers; keyless providers have none.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub google: Option<GoogleCredentials>,
    pub pixabay: Option<ApiKey>,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct CredentialResolver {
    key_dir: PathBuf,
    interactive: bool,
    env: EnvLookup,
}

impl CredentialResolver {
    /// Reads the process environment.
    pub fn new(config: &CredentialConfig) -> Self {
        Self {
            key_dir: config.key_dir.clone(),
            interactive: config.interactive,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replaces the environment lookup.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    /// Resolves everything the selected providers need, failing on the first
    /// credential that no source provides.
    pub fn resolve_for(&self, config: &AppConfig) -> Result<ProviderCredentials, ConfigError> {
        let mut credentials = ProviderCredentials::default();
        for kind in &config.search.providers {
            match kind {
                ProviderKind::Bing => {}
                ProviderKind::Google if credentials.google.is_none() => {
                    let api_key = self.resolve(&GOOGLE_API_KEY, config.google.api_key.as_deref())?;
                    let cx = self.resolve(&GOOGLE_ENGINE_ID, config.google.cx.as_deref())?;
                    credentials.google = Some(GoogleCredentials {
                        api_key: ApiKey::new(api_key),
                        cx,
                    });
                }
                ProviderKind::Pixabay if credentials.pixabay.is_none() => {
                    let api_key = self.resolve(&PIXABAY_API_KEY, config.pixabay.api_key.as_deref())?;
                    credentials.pixabay = Some(ApiKey::new(api_key));
                }
                ProviderKind::Google | ProviderKind::Pixabay => {}
            }
        }
        Ok(credentials)
    }

    pub fn resolve(&self, spec: &CredentialSpec, explicit: Option<&str>) -> Result<String, ConfigError> {
        if let Some(value) = non_blank(explicit) {
            debug!("{} {} taken from explicit configuration", spec.provider, spec.name);
            return Ok(value);
        }
        if let Some(value) = non_blank((self.env)(spec.env_var).as_deref()) {
            debug!("{} {} taken from ${}", spec.provider, spec.name, spec.env_var);
            return Ok(value);
        }
        let path = self.key_dir.join(spec.file_name);
        if let Some(value) = read_first_line(&path) {
            info!("{} {} read from {:?}", spec.provider, spec.name, path);
            return Ok(value);
        }
        if self.interactive {
            if let Some(value) = prompt(spec) {
                return Ok(value);
            }
        }
        Err(ConfigError::missing_credential(spec.env_var, spec.provider.as_str()))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToString::to_string)
}

fn read_first_line(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    non_blank(content.lines().next())
}

fn prompt(spec: &CredentialSpec) -> Option<String> {
    let label = format!("Enter {} {}", spec.provider, spec.name);
    let answer = if spec.secret {
        dialoguer::Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact()
    } else {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
    };
    answer.ok().and_then(|value| non_blank(Some(&value)))
}
