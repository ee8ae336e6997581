//! # Input Validation: URLs
//!
//! Cosmetic crate metadata links must not block a publish, so invalid values
//! are cleared instead of rejected.

use url::Url;

/// Returns true for absolute `http` or `https` URLs with a host.
pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Returns the URL unchanged when valid, otherwise an empty string.
pub fn normalize_url(candidate: Option<String>) -> String {
    match candidate {
        Some(url) if is_valid_url(&url) => url,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com/docs/index.html"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("/relative/path"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url(Some("https://docs.rs/serde".to_string())),
            "https://docs.rs/serde"
        );
        assert_eq!(normalize_url(Some("not a url".to_string())), "");
        assert_eq!(normalize_url(None), "");
    }
}
