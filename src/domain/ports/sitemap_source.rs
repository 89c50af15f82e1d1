use crate::domain::errors::DomainError;
use async_trait::async_trait;

/// Retrieves the raw sitemap body. A non-success response is an error.
#[async_trait]
pub trait SitemapSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, DomainError>;
}
