use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

/// Failure of a single page. Never escapes a sitemap load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Markup rejected: {0}")]
    Markup(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl PageError {
    pub fn markup(msg: impl Into<String>) -> Self {
        Self::Markup(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Markup(_) => FailureKind::Markup,
            Self::Fetch(_) => FailureKind::Fetch,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Worker(_) => FailureKind::Worker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Markup,
    Fetch,
    Timeout,
    Worker,
}
