use sha2::{Digest, Sha256};
use url::Url;

/// Number of hex characters of the query hash kept in a storage key
const QUERY_HASH_LEN: usize = 8;

/// Maps a URL to a stable, relative, `/`-separated storage key
///
/// The key is built from the host (plus port, if any) and the path segments.
/// A directory-like path maps to `index.<ext>`, and a last segment without an
/// `htm`-family extension gets `.<ext>` appended. A query string contributes a
/// short hash suffix so that distinct queries land on distinct keys.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_spider::url::storage_key;
///
/// let url = Url::parse("https://example.com/docs/guide").unwrap();
/// assert_eq!(storage_key(&url, "html"), "example.com/docs/guide.html");
///
/// let url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(storage_key(&url, "html"), "example.com/index.html");
/// ```
pub fn storage_key(url: &Url, default_extension: &str) -> String {
    let mut parts = vec![host_component(url)];

    let mut segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty() && *s != "." && *s != "..")
                .map(sanitize_segment)
                .collect()
        })
        .unwrap_or_default();

    let directory_like = segments.is_empty() || url.path().ends_with('/');
    let mut file_name = if directory_like {
        "index".to_string()
    } else {
        segments.pop().unwrap_or_else(|| "index".to_string())
    };

    let has_document_extension = !directory_like && has_htm_extension(&file_name);

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        let suffix = query_hash(query);
        file_name = match file_name.rsplit_once('.') {
            Some((stem, ext)) if has_document_extension => format!("{}-{}.{}", stem, suffix, ext),
            _ => format!("{}-{}", file_name, suffix),
        };
    }

    if !has_document_extension {
        file_name = format!("{}.{}", file_name, default_extension);
    }

    parts.extend(segments);
    parts.push(file_name);
    parts.join("/")
}

fn host_component(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown-host").to_lowercase();
    match url.port() {
        Some(port) => sanitize_segment(&format!("{}_{}", host, port)),
        None => sanitize_segment(&host),
    }
}

/// Returns true if the segment's extension belongs to the htm family
fn has_htm_extension(segment: &str) -> bool {
    segment
        .rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ext.to_ascii_lowercase().contains("htm"))
        .unwrap_or(false)
}

/// Replaces characters that are unsafe in file names
fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn query_hash(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(QUERY_HASH_LEN);
    encoded
}
