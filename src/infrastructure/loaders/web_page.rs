use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use crate::domain::{ports::PageLoader, Fragment, PageError};

/// Subtrees that never carry page content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe", "svg",
    "template",
];

const MARKUP_TYPES: &[&str] = &["text/", "application/xhtml", "application/xml"];

/// Fetches a page and turns its visible text into a single fragment.
pub struct WebPageLoader {
    client: reqwest::Client,
}

impl WebPageLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageLoader for WebPageLoader {
    #[instrument(skip(self))]
    async fn load_page(&self, url: &str) -> Result<Vec<Fragment>, PageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PageError::fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| PageError::fetch(e.to_string()))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(content_type) = content_type {
            if !MARKUP_TYPES.iter().any(|t| content_type.starts_with(t)) {
                return Err(PageError::markup(format!(
                    "unsupported content type {content_type}"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| PageError::fetch(e.to_string()))?;

        let content = extract_text(&body);
        if content.is_empty() {
            debug!("page has no text content");
            return Ok(Vec::new());
        }

        Ok(vec![Fragment::from_url(content, url)])
    }
}

/// Visible text of an HTML document, whitespace collapsed.
///
/// Only `<body>` is read when present. Scripts, styles and page chrome
/// (navigation, header, footer) are dropped.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    collect_text(root, &mut raw);
    clean_text(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
