//! Content hashing and domain derivation for cache keys.

use ring::digest::{SHA256, digest};

/// Stable hex digest of extracted policy text.
pub fn content_hash(text: &str) -> String {
    hex::encode(digest(&SHA256, text.as_bytes()).as_ref())
}

/// Host part of a page URL, or `"unknown"` when there is none.
pub fn domain_of(raw_url: &str) -> String {
    url::Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = content_hash("We may sell your data.");
        assert_eq!(a, content_hash("We may sell your data."));
        assert_ne!(a, content_hash("We may not sell your data."));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn domain_from_url() {
        assert_eq!(domain_of("https://www.acme.com/legal/privacy"), "www.acme.com");
        assert_eq!(domain_of("not a url"), "unknown");
        assert_eq!(domain_of("file:///tmp/terms.html"), "unknown");
    }
}
