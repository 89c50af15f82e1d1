pub mod config;
pub mod http;
pub mod loaders;

pub use config::{AppConfig, LoaderConfig};
pub use http::{build_client, HttpSitemapSource};
pub use loaders::{extract_text, WebPageLoader};
