//! Duplicate-detection keys for rules
//!
//! Two rules sharing an identity key are functional duplicates. Preset
//! application checks every template against the target container's existing
//! rules before inserting anything; rule-entry UIs use the same keys to warn
//! about duplicates. Pure computation, never on the resolution hot path.
//!
//! # Examples
//!
//! ```
//! use silo_core::identity::identity_keys;
//! use silo_core::types::{MatchType, RuleType};
//!
//! let a = identity_keys("example.com", MatchType::Domain, RuleType::Include, "work");
//! let b = identity_keys("https://example.com/", MatchType::Exact, RuleType::Include, "work");
//! assert!(a.iter().any(|key| b.contains(key)));
//! ```

use url::Url;

use crate::nav::canonicalize;
use crate::types::{MatchType, RuleType};

/// Canonical identity keys for a rule.
///
/// The primary key covers byte-identical rules after normalization. An
/// `exact` pattern that is a bare origin (root path, no query or fragment)
/// additionally yields the key of the equivalent bare `domain` pattern, so
/// the two spellings collide.
pub fn identity_keys(
    pattern: &str,
    match_type: MatchType,
    rule_type: RuleType,
    container_id: &str,
) -> Vec<String> {
    let normalized = normalize_pattern(pattern, match_type);
    let mut keys = vec![make_key(container_id, rule_type, match_type, &normalized)];

    if match_type == MatchType::Exact {
        if let Some(host) = bare_origin_host(pattern) {
            keys.push(make_key(container_id, rule_type, MatchType::Domain, &host));
        }
    }

    keys
}

fn make_key(container_id: &str, rule_type: RuleType, match_type: MatchType, pattern: &str) -> String {
    format!(
        "{container_id}|{}|{}|{pattern}",
        rule_type.as_str(),
        match_type.as_str()
    )
}

fn normalize_pattern(pattern: &str, match_type: MatchType) -> String {
    let trimmed = pattern.trim();
    match match_type {
        MatchType::Exact => match Url::parse(trimmed) {
            Ok(url) => canonicalize(&url),
            Err(_) => trimmed.to_string(),
        },
        MatchType::Domain => trimmed.trim_end_matches('.').to_ascii_lowercase(),
        // Glob and regex patterns are case- and byte-significant
        MatchType::Glob | MatchType::Regex => trimmed.to_string(),
    }
}

/// Host of an exact pattern that names a bare origin, lowercased.
fn bare_origin_host(pattern: &str) -> Option<String> {
    let url = Url::parse(pattern.trim()).ok()?;
    if !url.path().is_empty() && url.path() != "/" {
        return None;
    }
    if url.query().is_some() || url.fragment().is_some() {
        return None;
    }
    url.host_str().map(|host| host.to_ascii_lowercase())
}
