use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::{default_concurrency, DEFAULT_PAGE_TIMEOUT_SECS};
use crate::domain::DomainError;

pub const CONFIG_PATH_ENV: &str = "SITEMAP_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Maximum number of pages fetched at once.
    pub concurrency: usize,
    /// Applied to every HTTP request and to each page load as a whole.
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_seconds: DEFAULT_PAGE_TIMEOUT_SECS,
            user_agent: concat!("sitemap-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl AppConfig {
    /// Reads the YAML file named by `SITEMAP_CONFIG` (if set), then applies
    /// environment overrides.
    pub fn load() -> Result<Self, DomainError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DomainError::config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, DomainError> {
        serde_yaml::from_str(raw).map_err(|e| DomainError::config(e.to_string()))
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SITEMAP_CONCURRENCY") {
            self.loader.concurrency = parse_env("SITEMAP_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("SITEMAP_REQUEST_TIMEOUT_SECONDS") {
            self.loader.request_timeout_seconds =
                parse_env("SITEMAP_REQUEST_TIMEOUT_SECONDS", &value)?;
        }
        if let Some(value) = lookup("SITEMAP_USER_AGENT") {
            self.loader.user_agent = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.loader.concurrency == 0 {
            return Err(DomainError::validation("loader.concurrency must be at least 1"));
        }
        if self.loader.request_timeout_seconds == 0 {
            return Err(DomainError::validation(
                "loader.request_timeout_seconds must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DomainError::config(format!("{key}={value}: {e}")))
}
