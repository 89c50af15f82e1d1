use async_trait::async_trait;
use tracing::instrument;

use crate::domain::{ports::SitemapSource, DomainError};

pub struct HttpSitemapSource {
    client: reqwest::Client,
}

impl HttpSitemapSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SitemapSource for HttpSitemapSource {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::discovery(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| DomainError::discovery(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| DomainError::discovery(format!("failed to read {url}: {e}")))
    }
}
