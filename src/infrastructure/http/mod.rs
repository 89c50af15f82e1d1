mod sitemap_source;

pub use sitemap_source::HttpSitemapSource;

use crate::domain::DomainError;
use crate::infrastructure::config::LoaderConfig;

/// Builds the client shared by the sitemap source and the page loader.
pub fn build_client(config: &LoaderConfig) -> Result<reqwest::Client, DomainError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| DomainError::config(format!("failed to build HTTP client: {e}")))
}
