//! URL handling module for Sumi-Spider
//!
//! This module provides URL normalization (the canonical keys used by the
//! visited registry), root URL validation, and the deterministic mapping from
//! a URL to a content store key.

mod key;
mod normalize;

pub use key::storage_key;
pub use normalize::{canonicalize, normalize_url};

use crate::SpiderError;
use url::Url;

/// Parses and normalizes the root URL of a crawl
///
/// A root that cannot be parsed is a setup failure: it aborts the crawl
/// before anything is scheduled.
///
/// # Examples
///
/// ```
/// use sumi_spider::url::parse_root_url;
///
/// assert!(parse_root_url("https://example.com").is_ok());
/// assert!(parse_root_url("example.com").is_err());
/// ```
pub fn parse_root_url(root: &str) -> Result<Url, SpiderError> {
    normalize_url(root).map_err(|e| SpiderError::Setup(format!("Invalid root URL '{}': {}", root, e)))
}
