//! Page identity normalization
//!
//! A page's normalized identity is its hostname (without a leading `www.`)
//! followed by its path when the path is not the root, with one trailing
//! slash removed. Query strings and fragments never take part, so
//! `https://www.example.com/docs/?q=1#top` and `http://example.com/docs`
//! share the identity `example.com/docs`.
//!
//! The identity is used both as the storage key for links created on a page
//! and as the test that decides whether two links point at each other.

use url::Url;

/// Internal browser pages that never carry links
const INTERNAL_PREFIXES: &[&str] = &["chrome://", "chrome-extension://", "about:"];

/// Normalize a URL to its page identity
///
/// Never fails: input that does not parse as an absolute URL is returned
/// unchanged.
pub fn normalize_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };

    let host = parsed.host_str().unwrap_or("");
    let mut normalized = host.strip_prefix("www.").unwrap_or(host).to_string();

    if parsed.path() != "/" {
        normalized.push_str(parsed.path());
    }

    if normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Check whether a string is an absolute URL
pub fn validate_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Check whether a URL belongs to the browser itself rather than a web page
pub fn is_internal_page(url: &str) -> bool {
    url.is_empty() || INTERNAL_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_url_is_bare_host() {
        assert_eq!(normalize_url("https://www.example.com/"), "example.com");
        assert_eq!(normalize_url("https://example.com"), "example.com");
        assert_eq!(normalize_url("http://docs.rs/"), "docs.rs");
    }

    #[test]
    fn test_path_is_kept_without_trailing_slash() {
        assert_eq!(normalize_url("https://example.com/foo/"), "example.com/foo");
        assert_eq!(
            normalize_url("https://www.example.com/a/b/c"),
            "example.com/a/b/c"
        );
    }

    #[test]
    fn test_only_one_trailing_slash_is_stripped() {
        assert_eq!(normalize_url("https://example.com/foo//"), "example.com/foo/");
    }

    #[test]
    fn test_query_and_fragment_are_dropped() {
        assert_eq!(
            normalize_url("https://example.com/search?q=rust#results"),
            "example.com/search"
        );
        assert_eq!(
            normalize_url("https://example.com/search?q=rust"),
            normalize_url("https://example.com/search?q=go")
        );
    }

    #[test]
    fn test_scheme_and_port_are_ignored() {
        assert_eq!(
            normalize_url("http://example.com/page"),
            normalize_url("https://example.com/page")
        );
        assert_eq!(normalize_url("https://example.com:8443/x"), "example.com/x");
    }

    #[test]
    fn test_only_leading_www_is_stripped() {
        assert_eq!(normalize_url("https://wwwx.example.com/"), "wwwx.example.com");
        assert_eq!(normalize_url("https://api.www.example.com/"), "api.www.example.com");
    }

    #[test]
    fn test_malformed_input_is_returned_unchanged() {
        assert_eq!(normalize_url("not a url"), "not a url");
        assert_eq!(normalize_url("example.com/foo/"), "example.com/foo/");
        assert_eq!(normalize_url("/relative/path"), "/relative/path");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_normalizing_is_deterministic() {
        let url = "https://www.rust-lang.org/learn/";
        assert_eq!(normalize_url(url), normalize_url(url));
        assert_eq!(normalize_url(url), "rust-lang.org/learn");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com"));
        assert!(validate_url("mailto:someone@example.com"));
        assert!(!validate_url("example.com"));
        assert!(!validate_url(""));
        assert!(!validate_url("http://"));
    }

    #[test]
    fn test_internal_pages() {
        assert!(is_internal_page(""));
        assert!(is_internal_page("chrome://settings"));
        assert!(is_internal_page("chrome-extension://abc/options.html"));
        assert!(is_internal_page("about:blank"));
        assert!(!is_internal_page("https://example.com"));
    }
}
