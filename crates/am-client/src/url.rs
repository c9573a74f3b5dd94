//! URL assembly.

use std::fmt::Write as _;

/// Appends query parameters to `path`, skipping empty values.
///
/// Values are percent-encoded. If `path` already carries a query string the
/// parameters are appended with `&`.
///
/// # Examples
///
/// ```
/// use am_client::build_url;
///
/// let params = [("page", "2".to_owned()), ("search", String::new()), ("q", "стол 1".to_owned())];
/// assert_eq!(build_url("/assets", &params), "/assets?page=2&q=%D1%81%D1%82%D0%BE%D0%BB%201");
/// assert_eq!(build_url("/export/assets?format=excel", &[("status", "active".to_owned())]),
///     "/export/assets?format=excel&status=active");
/// assert_eq!(build_url::<&str>("/assets", &[]), "/assets");
/// ```
#[must_use]
pub fn build_url<K: AsRef<str>>(path: &str, params: &[(K, String)]) -> String {
    let query = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", encode(key.as_ref()), encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        return path.to_owned();
    }
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{query}")
}

/// Joins the base URL and a path with exactly one slash.
///
/// Absolute URLs are returned unchanged.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_owned();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() { base.to_owned() } else { format!("{base}/{path}") }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
#[must_use]
pub fn encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_dropped() {
        let params = [("category", String::new()), ("status", "active".to_owned())];
        assert_eq!(build_url("/assets", &params), "/assets?status=active");
        assert_eq!(build_url("/assets", &[("search", String::new())]), "/assets");
    }

    #[test]
    fn test_reserved_characters_encoded() {
        assert_eq!(encode("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode("Fixed Assets"), "Fixed%20Assets");
        assert_eq!(encode("2024-01-01"), "2024-01-01");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://localhost:8000/", "/assets"), "http://localhost:8000/assets");
        assert_eq!(join_url("http://localhost:8000", "health"), "http://localhost:8000/health");
        assert_eq!(join_url("http://a", "https://b/c"), "https://b/c");
        assert_eq!(join_url("http://a/", ""), "http://a");
    }
}
