//! Parsed navigation URL
//!
//! A navigation URL is parsed once per resolution and shared by every rule
//! predicate, so the hot path never re-parses.

use url::Url;

/// A navigation URL with the views the four grammars need.
#[derive(Debug, Clone)]
pub struct NavUrl {
    raw: String,
    canonical: String,
    host: String,
}

impl NavUrl {
    /// Parse a navigation URL. Fails only when the string is not an absolute
    /// URL; callers treat that as "matches nothing", never as an error.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed)?;
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        Ok(Self {
            raw: trimmed.to_string(),
            canonical: canonicalize(&url),
            host,
        })
    }

    /// The URL string as supplied (trimmed). Globs and regexes test this.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Canonical form for exact comparison.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Lowercased hostname; empty for host-less URLs.
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Canonical exact-match form: the serialized URL (lowercased scheme/host,
/// default port dropped by the parser) with trailing slashes stripped from
/// non-root paths. Query and fragment stay significant.
pub(crate) fn canonicalize(url: &Url) -> String {
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let mut normalized = url.clone();
        let trimmed = path.trim_end_matches('/');
        normalized.set_path(if trimmed.is_empty() { "/" } else { trimmed });
        normalized.to_string()
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_lowercases_scheme_and_host() {
        let nav = NavUrl::parse("HTTPS://EXAMPLE.COM/Path").unwrap();
        assert_eq!(nav.canonical(), "https://example.com/Path");
        assert_eq!(nav.host(), "example.com");
    }

    #[test]
    fn canonical_drops_default_port() {
        let nav = NavUrl::parse("https://example.com:443/x").unwrap();
        assert_eq!(nav.canonical(), "https://example.com/x");
        let nav = NavUrl::parse("http://example.com:8080/x").unwrap();
        assert_eq!(nav.canonical(), "http://example.com:8080/x");
    }

    #[test]
    fn canonical_strips_trailing_slash_on_non_root_paths() {
        let nav = NavUrl::parse("https://example.com/a/b/").unwrap();
        assert_eq!(nav.canonical(), "https://example.com/a/b");
        // Root stays root
        let nav = NavUrl::parse("https://example.com").unwrap();
        assert_eq!(nav.canonical(), "https://example.com/");
        let nav = NavUrl::parse("https://example.com/").unwrap();
        assert_eq!(nav.canonical(), "https://example.com/");
    }

    #[test]
    fn canonical_keeps_query_and_fragment() {
        let nav = NavUrl::parse("https://example.com/a/?q=1#frag").unwrap();
        assert_eq!(nav.canonical(), "https://example.com/a?q=1#frag");
    }

    #[test]
    fn raw_is_trimmed_input() {
        let nav = NavUrl::parse("  https://example.com/A?x=1 ").unwrap();
        assert_eq!(nav.raw(), "https://example.com/A?x=1");
    }

    #[test]
    fn rejects_relative_input() {
        assert!(NavUrl::parse("example.com/path").is_err());
    }
}
