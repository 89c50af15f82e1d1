use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{FailureKind, PageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PageOutcome {
    Loaded { fragments: usize },
    Failed { kind: FailureKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStatus {
    pub url: String,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

impl PageStatus {
    pub fn loaded(url: impl Into<String>, fragments: usize) -> Self {
        Self {
            url: url.into(),
            outcome: PageOutcome::Loaded { fragments },
        }
    }

    pub fn failed(url: impl Into<String>, error: &PageError) -> Self {
        Self {
            url: url.into(),
            outcome: PageOutcome::Failed {
                kind: error.kind(),
                reason: error.to_string(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, PageOutcome::Loaded { .. })
    }
}

/// Per-page outcomes of one sitemap load, in completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadReport {
    pub sitemap_url: String,
    pub pages: Vec<PageStatus>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl LoadReport {
    pub fn discovered(&self) -> usize {
        self.pages.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_loaded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.discovered() - self.loaded_count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageStatus> {
        self.pages.iter().filter(|p| !p.is_loaded())
    }
}
