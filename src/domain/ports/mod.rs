mod page_loader;
mod sitemap_source;

pub use page_loader::PageLoader;
pub use sitemap_source::SitemapSource;
