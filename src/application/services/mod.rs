mod sitemap;

pub use sitemap::{default_concurrency, SitemapService, DEFAULT_PAGE_TIMEOUT_SECS};
