use std::sync::Arc;

use anyhow::Context;
use sitemap_ingest::application::SitemapService;
use sitemap_ingest::infrastructure::{build_client, AppConfig, HttpSitemapSource, WebPageLoader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let (plain, json) = if json_logs {
        (None, Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)), None)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitemap_ingest=info".into()),
        )
        .with(plain)
        .with(json)
        .init();

    let sitemap_url = std::env::args()
        .nth(1)
        .context("usage: sitemap-ingest <sitemap-url>")?;

    let config = AppConfig::load()?;
    let client = build_client(&config.loader)?;

    let service = SitemapService::new(
        Arc::new(HttpSitemapSource::new(client.clone())),
        Arc::new(WebPageLoader::new(client)),
    )
    .with_concurrency(config.loader.concurrency)
    .with_page_timeout(config.loader.request_timeout());

    let (document, report) = service.load_with_report(&sitemap_url).await?;
    info!(
        loaded = report.loaded_count(),
        failed = report.failed_count(),
        "{} of {} pages loaded",
        report.loaded_count(),
        report.discovered()
    );

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
