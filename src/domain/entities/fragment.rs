use serde::{Deserialize, Serialize};

/// A unit of page content produced by a [`PageLoader`](crate::domain::ports::PageLoader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub content: String,
    pub meta_data: serde_json::Value,
}

impl Fragment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            meta_data: serde_json::json!({}),
        }
    }

    pub fn from_url(content: impl Into<String>, url: &str) -> Self {
        Self::new(content).with_metadata(serde_json::json!({ "url": url }))
    }

    pub fn with_metadata(mut self, meta_data: serde_json::Value) -> Self {
        self.meta_data = meta_data;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.meta_data.get("url").and_then(|u| u.as_str())
    }
}
