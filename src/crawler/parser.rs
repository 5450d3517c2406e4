//! HTML parser for extracting links
//!
//! This module handles parsing downloaded HTML to find the links the crawler
//! follows next.

use crate::url::canonicalize;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Finds the outgoing links of a downloaded document
pub trait LinkExtractor: Send + Sync + 'static {
    /// Returns the absolute, canonical links of `body`, resolved against `base`
    fn extract_links(&self, base: &Url, body: &str) -> Vec<Url>;
}

/// Link extractor for HTML documents
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, base: &Url, body: &str) -> Vec<Url> {
        parse_links(body, base)
    }
}

/// Parses HTML content and extracts the links to follow
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that is not HTTP(S) after resolution
///
/// Links are canonicalized and returned once each, in document order.
///
/// # Example
///
/// ```
/// use sumi_spider::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = parse_links(html, &base_url);
/// assert_eq!(links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in candidate_hrefs(&document) {
        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        if seen.insert(url.as_str().to_string()) {
            links.push(url);
        }
    }

    links
}

/// Collects raw href values from anchors and canonical links
fn candidate_hrefs(document: &Html) -> Vec<&str> {
    let mut hrefs = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                hrefs.push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href);
            }
        }
    }

    hrefs
}

/// Resolves a link href to a canonical absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    canonicalize(absolute_url).ok()
}
