//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! HTTP adapters, so they can be driven by in-memory fakes.

pub mod services;

pub use services::{default_concurrency, SitemapService};
