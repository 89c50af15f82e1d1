use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Fragment;
use crate::domain::errors::{DomainError, Result};

const LOC: &[u8] = b"loc";
const URL: &[u8] = b"url";

/// The aggregated content of every page a sitemap references.
///
/// `data` holds fragments in the order their pages finished loading, which is
/// not the order the sitemap lists them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapDocument {
    doc_id: String,
    data: Vec<Fragment>,
}

impl SitemapDocument {
    pub fn new(doc_id: impl Into<String>, data: Vec<Fragment>) -> Self {
        Self {
            doc_id: doc_id.into(),
            data,
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn data(&self) -> &[Fragment] {
        &self.data
    }

    pub fn into_parts(self) -> (String, Vec<Fragment>) {
        (self.doc_id, self.data)
    }
}

/// Page URLs found in a sitemap body, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLinks {
    pub links: Vec<String>,
    /// Set when no `<loc>` sat directly under a `<url>` and every `<loc>` was taken instead.
    pub fallback: bool,
    /// Set when the document ended with elements still open. Only `<loc>`
    /// entries closed before the cut are returned.
    pub truncated: bool,
}

/// Hex SHA-256 of the space-joined links followed directly by the sitemap URL.
///
/// Links come from [`extract_links`], so surrounding whitespace in `<loc>` is
/// already trimmed and does not affect the id.
pub fn compute_doc_id(links: &[String], sitemap_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(links.join(" ").as_bytes());
    hasher.update(sitemap_url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts `<loc>` values from a sitemap document.
///
/// Entries whose parent is `<url>` win. When there are none (sitemap indexes,
/// nonstandard layouts) every `<loc>` is returned. Namespace prefixes are
/// ignored and duplicates are kept.
pub fn extract_links(xml: &str) -> Result<DiscoveredLinks> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut under_url = Vec::new();
    let mut all = Vec::new();
    // (text so far, parent is <url>, depth of the open <loc>)
    let mut current: Option<(String, bool, usize)> = None;
    let mut saw_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                saw_element = true;
                let name = e.local_name().as_ref().to_vec();
                if name == LOC && current.is_none() {
                    let parent_is_url = stack.last().is_some_and(|p| p.as_slice() == URL);
                    current = Some((String::new(), parent_is_url, stack.len()));
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                saw_element = true;
                if e.local_name().as_ref() == LOC && current.is_none() {
                    if stack.last().is_some_and(|p| p.as_slice() == URL) {
                        under_url.push(String::new());
                    }
                    all.push(String::new());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((text, _, _)) = current.as_mut() {
                    let entry = all.len() + 1;
                    let unescaped = e.unescape().map_err(|err| {
                        DomainError::discovery(format!(
                            "invalid text in <loc> entry {entry} (after {} parsed): {err}",
                            all.len()
                        ))
                    })?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((text, _, _)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
                if current.as_ref().is_some_and(|(_, _, depth)| *depth == stack.len()) {
                    if let Some((text, parent_is_url, _)) = current.take() {
                        let link = text.trim().to_string();
                        if parent_is_url {
                            under_url.push(link.clone());
                        }
                        all.push(link);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DomainError::discovery(format!(
                    "invalid sitemap XML at position {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    let truncated = !stack.is_empty();
    if !saw_element {
        return Err(DomainError::discovery("invalid sitemap XML: no elements found"));
    }

    if under_url.is_empty() {
        Ok(DiscoveredLinks {
            fallback: !all.is_empty(),
            links: all,
            truncated,
        })
    } else {
        Ok(DiscoveredLinks {
            links: under_url,
            fallback: false,
            truncated,
        })
    }
}
