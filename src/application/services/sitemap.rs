use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    compute_doc_id, extract_links,
    ports::{PageLoader, SitemapSource},
    DomainError, Fragment, LoadReport, PageError, PageStatus, SitemapDocument,
};

pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Worker pool size used when none is configured: `min(32, cpus + 4)`.
pub fn default_concurrency() -> usize {
    (num_cpus::get() + 4).min(32)
}

/// Loads every page a sitemap references into one [`SitemapDocument`].
///
/// Only discovery can fail. Pages that fail or time out are logged and
/// skipped, and the remaining pages still make it into the document.
pub struct SitemapService {
    source: Arc<dyn SitemapSource>,
    page_loader: Arc<dyn PageLoader>,
    concurrency: usize,
    page_timeout: Duration,
}

impl SitemapService {
    pub fn new(source: Arc<dyn SitemapSource>, page_loader: Arc<dyn PageLoader>) -> Self {
        Self {
            source,
            page_loader,
            concurrency: default_concurrency(),
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn page_timeout(&self) -> Duration {
        self.page_timeout
    }

    #[instrument(skip(self))]
    pub async fn discover(&self, sitemap_url: &str) -> Result<Vec<String>, DomainError> {
        if sitemap_url.trim().is_empty() {
            return Err(DomainError::validation("sitemap URL must not be empty"));
        }

        let body = self.source.fetch(sitemap_url).await?;
        let found = extract_links(&body)?;
        if found.truncated {
            warn!(
                count = found.links.len(),
                "sitemap ended with open elements, keeping entries parsed so far"
            );
        }
        if found.fallback {
            warn!(
                count = found.links.len(),
                "no <loc> under <url>, using every <loc> in the document"
            );
        }

        Ok(found.links)
    }

    pub async fn load(&self, sitemap_url: &str) -> Result<SitemapDocument, DomainError> {
        self.load_with_report(sitemap_url)
            .await
            .map(|(document, _)| document)
    }

    /// Same as [`load`](Self::load), plus the outcome of every discovered page.
    #[instrument(skip(self), fields(concurrency = self.concurrency))]
    pub async fn load_with_report(
        &self,
        sitemap_url: &str,
    ) -> Result<(SitemapDocument, LoadReport), DomainError> {
        let started_at = Utc::now();
        let links = self.discover(sitemap_url).await?;
        let doc_id = compute_doc_id(&links, sitemap_url);
        let total = links.len();
        info!(%doc_id, total, "sitemap discovered");

        let mut data = Vec::new();
        let mut pages = Vec::with_capacity(total);

        let mut completed = stream::iter(links)
            .map(|link| {
                let handle = tokio::spawn(fetch_page(
                    self.page_loader.clone(),
                    link.clone(),
                    self.page_timeout,
                ));
                async move { (link, handle.await) }
            })
            .buffer_unordered(self.concurrency);

        while let Some((link, joined)) = completed.next().await {
            let result = joined.unwrap_or_else(|e| Err(PageError::Worker(e.to_string())));
            match result {
                Ok(fragments) => {
                    pages.push(PageStatus::loaded(&link, fragments.len()));
                    data.extend(fragments);
                }
                Err(e) => {
                    match &e {
                        PageError::Markup(_) => error!(url = %link, error = %e, "failed to parse page"),
                        _ => error!(url = %link, error = %e, "error loading page"),
                    }
                    pages.push(PageStatus::failed(&link, &e));
                }
            }
            debug!(completed = pages.len(), total, "loading pages");
        }

        let report = LoadReport {
            sitemap_url: sitemap_url.to_string(),
            pages,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            %doc_id,
            loaded = report.loaded_count(),
            failed = report.failed_count(),
            fragments = data.len(),
            "sitemap loaded"
        );

        Ok((SitemapDocument::new(doc_id, data), report))
    }
}

async fn fetch_page(
    loader: Arc<dyn PageLoader>,
    url: String,
    timeout: Duration,
) -> Result<Vec<Fragment>, PageError> {
    match tokio::time::timeout(timeout, loader.load_page(&url)).await {
        Ok(result) => result,
        Err(_) => Err(PageError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, PageOutcome};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SITEMAP_URL: &str = "https://example.com/sitemap.xml";

    struct StaticSource {
        body: Result<String, String>,
    }

    impl StaticSource {
        fn ok(body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                body: Ok(body.into()),
            })
        }

        fn status(code: u16) -> Arc<Self> {
            Arc::new(Self {
                body: Err(format!("HTTP status {code}")),
            })
        }
    }

    #[async_trait]
    impl SitemapSource for StaticSource {
        async fn fetch(&self, _url: &str) -> Result<String, DomainError> {
            self.body.clone().map_err(DomainError::discovery)
        }
    }

    enum Page {
        Fragments(Vec<&'static str>),
        Slow(Duration, Vec<&'static str>),
        Fail(PageError),
        Hang,
        Panic,
    }

    #[derive(Default)]
    struct FakeLoader {
        pages: HashMap<String, Page>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeLoader {
        fn with_page(mut self, url: &str, page: Page) -> Self {
            self.pages.insert(url.to_string(), page);
            self
        }
    }

    #[async_trait]
    impl PageLoader for FakeLoader {
        async fn load_page(&self, url: &str) -> Result<Vec<Fragment>, PageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.pages.get(url) {
                Some(Page::Fragments(items)) => {
                    Ok(items.iter().map(|c| Fragment::from_url(*c, url)).collect())
                }
                Some(Page::Slow(delay, items)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(items.iter().map(|c| Fragment::from_url(*c, url)).collect())
                }
                Some(Page::Fail(e)) => Err(e.clone()),
                Some(Page::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
                Some(Page::Panic) => panic!("loader blew up on {url}"),
                None => Err(PageError::fetch("HTTP status 404")),
            }
        }
    }

    fn urlset(links: &[&str]) -> String {
        let entries: String = links
            .iter()
            .map(|l| format!("<url><loc>{l}</loc></url>"))
            .collect();
        format!(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#)
    }

    fn contents(document: &SitemapDocument) -> Vec<String> {
        let mut contents: Vec<String> = document.data().iter().map(|f| f.content.clone()).collect();
        contents.sort();
        contents
    }

    #[tokio::test]
    async fn test_load_skips_page_that_fails_to_parse() {
        let source = StaticSource::ok(urlset(&["https://example.com/a", "https://example.com/b"]));
        let loader = Arc::new(
            FakeLoader::default()
                .with_page("https://example.com/a", Page::Fragments(vec!["A1", "A2"]))
                .with_page(
                    "https://example.com/b",
                    Page::Fail(PageError::markup("parser rejected markup")),
                ),
        );
        let service = SitemapService::new(source, loader);

        let document = service.load(SITEMAP_URL).await.unwrap();

        assert_eq!(contents(&document), vec!["A1", "A2"]);
        assert_eq!(
            document.doc_id(),
            "0c48cbbbdf16227c217d374af935e5677fe421dd25e1d9ba82b88ad5bf232eba"
        );
    }

    #[tokio::test]
    async fn test_fragments_follow_completion_order() {
        let source = StaticSource::ok(urlset(&["https://example.com/a", "https://example.com/b"]));
        let loader = Arc::new(
            FakeLoader::default()
                .with_page(
                    "https://example.com/a",
                    Page::Slow(Duration::from_millis(300), vec!["A"]),
                )
                .with_page("https://example.com/b", Page::Fragments(vec!["B"])),
        );
        let service = SitemapService::new(source, loader).with_concurrency(2);

        let (document, report) = service.load_with_report(SITEMAP_URL).await.unwrap();

        let contents: Vec<&str> = document.data().iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["B", "A"]);
        assert_eq!(
            report.pages.iter().map(|p| p.url.as_str()).collect::<Vec<_>>(),
            vec!["https://example.com/b", "https://example.com/a"]
        );
    }

    #[tokio::test]
    async fn test_doc_id_unaffected_by_page_outcomes() {
        let xml = urlset(&["https://example.com/a", "https://example.com/b"]);

        let all_ok = FakeLoader::default()
            .with_page("https://example.com/a", Page::Fragments(vec!["A"]))
            .with_page("https://example.com/b", Page::Fragments(vec!["B"]));
        let all_failed = FakeLoader::default();

        let first = SitemapService::new(StaticSource::ok(xml.clone()), Arc::new(all_ok))
            .load(SITEMAP_URL)
            .await
            .unwrap();
        let second = SitemapService::new(StaticSource::ok(xml), Arc::new(all_failed))
            .load(SITEMAP_URL)
            .await
            .unwrap();

        assert_eq!(first.doc_id(), second.doc_id());
        assert!(second.data().is_empty());
    }

    #[tokio::test]
    async fn test_load_uses_fallback_locs() {
        let xml = r#"<sitemapindex>
            <sitemap><loc>https://example.com/a</loc></sitemap>
            <sitemap><loc>https://example.com/b</loc></sitemap>
        </sitemapindex>"#;
        let loader = Arc::new(
            FakeLoader::default()
                .with_page("https://example.com/a", Page::Fragments(vec!["A"]))
                .with_page("https://example.com/b", Page::Fragments(vec!["B"])),
        );
        let service = SitemapService::new(StaticSource::ok(xml), loader.clone());

        let document = service.load(SITEMAP_URL).await.unwrap();

        assert_eq!(contents(&document), vec!["A", "B"]);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_fatal_and_fetches_nothing() {
        let loader = Arc::new(FakeLoader::default());
        let service = SitemapService::new(StaticSource::status(500), loader.clone());

        let result = service.load(SITEMAP_URL).await;

        assert!(matches!(result, Err(DomainError::Discovery(_))));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unparseable_sitemap_is_fatal() {
        let loader = Arc::new(FakeLoader::default());
        let service = SitemapService::new(StaticSource::ok("<urlset><url></urlset>"), loader.clone());

        assert!(matches!(
            service.load(SITEMAP_URL).await,
            Err(DomainError::Discovery(_))
        ));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_sitemap_url_is_rejected() {
        let service = SitemapService::new(StaticSource::ok("<urlset/>"), Arc::new(FakeLoader::default()));
        assert!(matches!(
            service.load("  ").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_sitemap_yields_empty_document() {
        let service =
            SitemapService::new(StaticSource::ok("<urlset></urlset>"), Arc::new(FakeLoader::default()));

        let (document, report) = service.load_with_report(SITEMAP_URL).await.unwrap();

        assert!(document.data().is_empty());
        assert_eq!(document.doc_id(), compute_doc_id(&[], SITEMAP_URL));
        assert_eq!(report.discovered(), 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_report_records_every_failure_kind() {
        let source = StaticSource::ok(urlset(&[
            "https://example.com/ok",
            "https://example.com/markup",
            "https://example.com/missing",
            "https://example.com/hang",
            "https://example.com/panic",
        ]));
        let loader = Arc::new(
            FakeLoader::default()
                .with_page("https://example.com/ok", Page::Fragments(vec!["OK"]))
                .with_page(
                    "https://example.com/markup",
                    Page::Fail(PageError::markup("unsupported content type")),
                )
                .with_page("https://example.com/hang", Page::Hang)
                .with_page("https://example.com/panic", Page::Panic),
        );
        let service = SitemapService::new(source, loader)
            .with_page_timeout(Duration::from_millis(50));

        let (document, report) = service.load_with_report(SITEMAP_URL).await.unwrap();

        assert_eq!(contents(&document), vec!["OK"]);
        assert_eq!(report.discovered(), 5);
        assert_eq!(report.loaded_count(), 1);
        assert_eq!(report.failed_count(), 4);

        let kind_of = |url: &str| {
            report
                .pages
                .iter()
                .find(|p| p.url == url)
                .map(|p| p.outcome.clone())
                .unwrap()
        };
        assert_eq!(
            kind_of("https://example.com/ok"),
            PageOutcome::Loaded { fragments: 1 }
        );
        for (url, expected) in [
            ("https://example.com/markup", FailureKind::Markup),
            ("https://example.com/missing", FailureKind::Fetch),
            ("https://example.com/hang", FailureKind::Timeout),
            ("https://example.com/panic", FailureKind::Worker),
        ] {
            match kind_of(url) {
                PageOutcome::Failed { kind, .. } => assert_eq!(kind, expected, "{url}"),
                other => panic!("expected failure for {url}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_page_with_no_fragments_counts_as_loaded() {
        let source = StaticSource::ok(urlset(&["https://example.com/blank"]));
        let loader = Arc::new(
            FakeLoader::default().with_page("https://example.com/blank", Page::Fragments(vec![])),
        );

        let (document, report) = SitemapService::new(source, loader)
            .load_with_report(SITEMAP_URL)
            .await
            .unwrap();

        assert!(document.data().is_empty());
        assert_eq!(report.loaded_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let links: Vec<String> = (0..12).map(|i| format!("https://example.com/{i}")).collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let mut loader = FakeLoader {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        for link in &links {
            loader.pages.insert(link.clone(), Page::Fragments(vec!["x"]));
        }
        let loader = Arc::new(loader);

        let service = SitemapService::new(StaticSource::ok(urlset(&refs)), loader.clone())
            .with_concurrency(3);
        let document = service.load(SITEMAP_URL).await.unwrap();

        assert_eq!(document.data().len(), 12);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 12);
        assert!(loader.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_concurrency_floor_and_default() {
        let service = SitemapService::new(StaticSource::ok(""), Arc::new(FakeLoader::default()))
            .with_concurrency(0);
        assert_eq!(service.concurrency(), 1);

        let default = default_concurrency();
        assert!((5..=32).contains(&default));
    }
}
