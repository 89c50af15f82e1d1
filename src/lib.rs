//! Sitemap ingestion for retrieval-augmented generation.
//!
//! [`SitemapService`](application::SitemapService) discovers the pages a
//! sitemap lists, loads them concurrently, and folds the results into one
//! [`SitemapDocument`](domain::SitemapDocument) keyed by a content-derived id.

pub mod application;
pub mod domain;
pub mod infrastructure;
