use crate::domain::{errors::PageError, Fragment};
use async_trait::async_trait;

#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load_page(&self, url: &str) -> Result<Vec<Fragment>, PageError>;
}
