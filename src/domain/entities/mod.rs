mod fragment;
mod report;
mod sitemap;

pub use fragment::Fragment;
pub use report::{LoadReport, PageOutcome, PageStatus};
pub use sitemap::{compute_doc_id, extract_links, DiscoveredLinks, SitemapDocument};
