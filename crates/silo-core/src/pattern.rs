//! Pattern compilation and matching
//!
//! Each rule's `(pattern, matchType)` compiles into a predicate over
//! navigation URLs. Compilation happens at rule create/update time (and is
//! memoized on the hot path by [`crate::cache::PatternCache`]); matching is
//! pure and deterministic.
//!
//! The regex grammar is backed by the `regex` crate, whose engine is
//! linear-time, so user-authored patterns cannot stall a navigation.
//!
//! # Examples
//!
//! ```
//! use silo_core::pattern::test_pattern;
//! use silo_core::types::MatchType;
//!
//! assert!(test_pattern("https://sub.example.com/x", "*.example.com", MatchType::Domain).unwrap());
//! assert!(!test_pattern("https://notexample.com", "*.example.com", MatchType::Domain).unwrap());
//! ```

use regex::{Regex, RegexBuilder};
use url::{Host, Url};

use crate::nav::{canonicalize, NavUrl};
use crate::types::MatchType;

/// Upper bound for a compiled user regex, in bytes.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

// =============================================================================
// Errors
// =============================================================================

/// Raised when a pattern is malformed for its grammar. Surfaces at rule
/// create/update time; resolution only ever sees compiled patterns.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,
    #[error("Not a valid absolute URL: {0}")]
    InvalidUrl(String),
    #[error("Not a valid hostname pattern: {0}")]
    InvalidHostname(String),
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(String),
    #[error("Regular expression exceeds the compiled size limit")]
    RegexTooLarge,
}

// =============================================================================
// Compiled Patterns
// =============================================================================

/// A rule pattern compiled for repeated evaluation.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Canonicalized absolute URL compared for equality
    Exact(String),
    /// Hostname; `subdomains` also covers any host below it
    Domain { host: String, subdomains: bool },
    /// Glob translated to an anchored regex over the full URL string
    Glob(Regex),
    /// User regex, engine-anchored when the author left it unanchored
    Regex(Regex),
}

impl CompiledPattern {
    /// Compile `pattern` under the grammar `match_type`.
    pub fn compile(pattern: &str, match_type: MatchType) -> Result<Self, PatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        match match_type {
            MatchType::Exact => compile_exact(pattern),
            MatchType::Domain => compile_domain(pattern),
            MatchType::Glob => translate_glob(pattern).map(Self::Glob),
            MatchType::Regex => compile_regex(pattern).map(Self::Regex),
        }
    }

    /// Whether this pattern matches the navigation URL.
    pub fn matches(&self, nav: &NavUrl) -> bool {
        match self {
            Self::Exact(canonical) => nav.canonical() == canonical,
            Self::Domain { host, subdomains } => host_matches(nav.host(), host, *subdomains),
            Self::Glob(re) | Self::Regex(re) => re.is_match(nav.raw()),
        }
    }
}

/// One-shot compile-and-test, the store's `testPattern` pass-through.
/// A URL that does not parse matches nothing.
pub fn test_pattern(url: &str, pattern: &str, match_type: MatchType) -> Result<bool, PatternError> {
    let compiled = CompiledPattern::compile(pattern, match_type)?;
    match NavUrl::parse(url) {
        Ok(nav) => Ok(compiled.matches(&nav)),
        Err(_) => Ok(false),
    }
}

// =============================================================================
// Grammar compilation
// =============================================================================

fn compile_exact(pattern: &str) -> Result<CompiledPattern, PatternError> {
    let url = Url::parse(pattern)
        .map_err(|err| PatternError::InvalidUrl(format!("{pattern}: {err}")))?;
    if !url.has_host() {
        return Err(PatternError::InvalidUrl(format!("{pattern}: missing host")));
    }
    Ok(CompiledPattern::Exact(canonicalize(&url)))
}

fn compile_domain(pattern: &str) -> Result<CompiledPattern, PatternError> {
    let (subdomains, host_part) = match pattern.strip_prefix("*.") {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let host_part = host_part.trim_end_matches('.');

    // No schemes, paths, ports, userinfo, or stray wildcards
    if host_part.is_empty()
        || host_part.contains('/')
        || host_part.contains(':')
        || host_part.contains('@')
        || host_part.contains('*')
        || host_part.contains('?')
    {
        return Err(PatternError::InvalidHostname(pattern.to_string()));
    }

    match Host::parse(host_part) {
        Ok(Host::Domain(domain)) => Ok(CompiledPattern::Domain {
            host: domain,
            subdomains,
        }),
        Ok(Host::Ipv4(addr)) if !subdomains => Ok(CompiledPattern::Domain {
            host: addr.to_string(),
            subdomains: false,
        }),
        _ => Err(PatternError::InvalidHostname(pattern.to_string())),
    }
}

fn translate_glob(pattern: &str) -> Result<Regex, PatternError> {
    let mut source = String::with_capacity(pattern.len() * 2 + 2);
    let mut literal = String::new();
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' | '?' => {
                if !literal.is_empty() {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                }
                if ch == '*' {
                    source.push_str(".*");
                } else {
                    source.push('.');
                }
            }
            _ => literal.push(ch),
        }
    }
    if !literal.is_empty() {
        source.push_str(&regex::escape(&literal));
    }
    source.push('$');

    build_regex(&source)
}

fn compile_regex(pattern: &str) -> Result<Regex, PatternError> {
    // Anchor only when the author left the pattern unanchored, to preserve
    // intent; an escaped trailing \$ does not count as an anchor.
    let explicitly_anchored =
        pattern.starts_with('^') || (pattern.ends_with('$') && !pattern.ends_with("\\$"));
    if explicitly_anchored {
        build_regex(pattern)
    } else {
        build_regex(&format!("^(?:{pattern})$"))
    }
}

fn build_regex(source: &str) -> Result<Regex, PatternError> {
    RegexBuilder::new(source)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|err| match err {
            regex::Error::CompiledTooBig(_) => PatternError::RegexTooLarge,
            other => PatternError::InvalidRegex(other.to_string()),
        })
}

fn host_matches(nav_host: &str, rule_host: &str, subdomains: bool) -> bool {
    if nav_host.is_empty() {
        return false;
    }
    if nav_host == rule_host {
        return true;
    }
    subdomains
        && nav_host.len() > rule_host.len()
        && nav_host.ends_with(rule_host)
        && nav_host.as_bytes()[nav_host.len() - rule_host.len() - 1] == b'.'
}

// =============================================================================
// matchType suggestion
// =============================================================================

/// Advisory heuristic for rule-entry UIs; never authoritative.
pub fn suggest_match_type(pattern: &str) -> MatchType {
    let pattern = pattern.trim();
    if looks_like_hostname(pattern) {
        return MatchType::Domain;
    }
    if pattern.contains('*') || pattern.contains('?') {
        return MatchType::Glob;
    }
    if Url::parse(pattern).map(|u| u.has_host()).unwrap_or(false) {
        return MatchType::Exact;
    }
    MatchType::Regex
}

fn looks_like_hostname(pattern: &str) -> bool {
    let rest = pattern.strip_prefix("*.").unwrap_or(pattern);
    if rest.is_empty()
        || !rest.contains('.')
        || rest.contains('/')
        || rest.contains(':')
        || rest.contains('*')
        || rest.contains('?')
    {
        return false;
    }
    matches!(Host::parse(rest), Ok(Host::Domain(_)) | Ok(Host::Ipv4(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test(url: &str, pattern: &str, match_type: MatchType) -> bool {
        test_pattern(url, pattern, match_type).expect("pattern should compile")
    }

    #[test]
    fn exact_matches_after_normalization() {
        assert!(test(
            "https://example.com",
            "HTTPS://EXAMPLE.COM:443/",
            MatchType::Exact
        ));
        assert!(test(
            "https://example.com/a/b/",
            "https://example.com/a/b",
            MatchType::Exact
        ));
        assert!(!test(
            "https://example.com/a?x=1",
            "https://example.com/a",
            MatchType::Exact
        ));
    }

    #[test]
    fn exact_path_is_case_sensitive() {
        assert!(!test(
            "https://example.com/Path",
            "https://example.com/path",
            MatchType::Exact
        ));
    }

    #[test]
    fn exact_rejects_non_urls() {
        assert!(matches!(
            CompiledPattern::compile("example.com/a", MatchType::Exact),
            Err(PatternError::InvalidUrl(_))
        ));
    }

    #[test]
    fn domain_bare_form_is_equality() {
        assert!(test("https://example.com/x", "example.com", MatchType::Domain));
        assert!(!test(
            "https://sub.example.com/x",
            "example.com",
            MatchType::Domain
        ));
    }

    #[test]
    fn domain_wildcard_covers_host_and_subdomains() {
        assert!(test(
            "https://sub.example.com/x",
            "*.example.com",
            MatchType::Domain
        ));
        assert!(test("https://example.com", "*.example.com", MatchType::Domain));
        assert!(!test(
            "https://notexample.com",
            "*.example.com",
            MatchType::Domain
        ));
    }

    #[test]
    fn domain_is_case_insensitive() {
        assert!(test("https://EXAMPLE.com", "Example.COM", MatchType::Domain));
    }

    #[test]
    fn domain_rejects_schemes_paths_and_ports() {
        for bad in [
            "https://example.com",
            "example.com/path",
            "example.com:8080",
            "exa mple.com",
        ] {
            assert!(
                matches!(
                    CompiledPattern::compile(bad, MatchType::Domain),
                    Err(PatternError::InvalidHostname(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn glob_star_spans_path_separators() {
        assert!(test(
            "https://example.com/a/b",
            "https://example.com/*",
            MatchType::Glob
        ));
        assert!(!test(
            "https://other.com/a",
            "https://example.com/*",
            MatchType::Glob
        ));
    }

    #[test]
    fn glob_question_mark_matches_exactly_one_char() {
        assert!(test(
            "https://example.com/a",
            "https://example.com/?",
            MatchType::Glob
        ));
        assert!(!test(
            "https://example.com/ab",
            "https://example.com/?",
            MatchType::Glob
        ));
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        // The dot in the host must not act as a regex wildcard
        assert!(!test(
            "https://exampleXcom/",
            "https://example.com/*",
            MatchType::Glob
        ));
        assert!(test(
            "https://example.com/a+b",
            "https://example.com/a+b",
            MatchType::Glob
        ));
    }

    #[test]
    fn glob_is_anchored_both_ends() {
        assert!(!test(
            "https://example.com/ad/x",
            "*/ad",
            MatchType::Glob
        ));
        assert!(test("https://example.com/ad", "*/ad", MatchType::Glob));
    }

    #[test]
    fn regex_unanchored_patterns_are_anchored_by_engine() {
        assert!(test(
            "https://example.com/x",
            r"https://example\.com/x",
            MatchType::Regex
        ));
        // Whole-string anchoring: a substring alone must not match
        assert!(!test("https://example.com/x", r"example", MatchType::Regex));
    }

    #[test]
    fn regex_explicit_anchors_are_preserved() {
        assert!(test(
            "https://example.com/path",
            r"^https://example\.com/",
            MatchType::Regex
        ));
        assert!(test(
            "https://example.com/login",
            r"/login$",
            MatchType::Regex
        ));
    }

    #[test]
    fn regex_rejects_invalid_patterns() {
        assert!(matches!(
            CompiledPattern::compile("(unclosed", MatchType::Regex),
            Err(PatternError::InvalidRegex(_))
        ));
    }

    #[test]
    fn regex_rejects_oversized_patterns() {
        // Nested counted repetitions explode the compiled automaton
        let huge = "((?:a{1000}){1000}){1000}";
        assert!(matches!(
            CompiledPattern::compile(huge, MatchType::Regex),
            Err(PatternError::RegexTooLarge)
        ));
    }

    #[test]
    fn empty_patterns_are_rejected_for_all_grammars() {
        for mt in [
            MatchType::Exact,
            MatchType::Domain,
            MatchType::Glob,
            MatchType::Regex,
        ] {
            assert!(matches!(
                CompiledPattern::compile("   ", mt),
                Err(PatternError::Empty)
            ));
        }
    }

    #[test]
    fn test_is_deterministic() {
        for _ in 0..3 {
            assert!(test(
                "https://sub.example.com/x",
                "*.example.com",
                MatchType::Domain
            ));
        }
    }

    #[test]
    fn unparseable_url_matches_nothing() {
        assert!(!test("not a url", "*.example.com", MatchType::Domain));
        assert!(!test("not a url", "*", MatchType::Glob));
    }

    #[test]
    fn suggestions_follow_pattern_shape() {
        assert_eq!(suggest_match_type("example.com"), MatchType::Domain);
        assert_eq!(suggest_match_type("*.example.com"), MatchType::Domain);
        assert_eq!(
            suggest_match_type("https://example.com/*"),
            MatchType::Glob
        );
        assert_eq!(
            suggest_match_type("https://example.com/login"),
            MatchType::Exact
        );
        assert_eq!(suggest_match_type(r"^https://.+\.bank\."), MatchType::Regex);
    }
}
