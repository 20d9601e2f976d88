//! Core type definitions for Silo
//!
//! These types are the wire shapes exchanged with the extension UI and the
//! background service; TypeScript definitions are generated via `ts-rs`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Match Types (pattern grammars)
// =============================================================================

/// Grammar used to interpret a rule's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MatchType {
    /// Whole-URL equality after canonicalization
    Exact,
    /// Bare hostname, optionally `*.host` to cover subdomains
    Domain,
    /// `*`/`?` wildcards over the full URL string
    Glob,
    /// User-authored regular expression
    Regex,
}

impl MatchType {
    /// Specificity rank used to break priority ties: exact > domain > glob > regex.
    pub const fn specificity(self) -> u8 {
        match self {
            Self::Exact => 3,
            Self::Domain => 2,
            Self::Glob => 1,
            Self::Regex => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Domain => "domain",
            Self::Glob => "glob",
            Self::Regex => "regex",
        }
    }
}

/// Error for parsing a matchType from its wire spelling.
#[derive(Debug, thiserror::Error)]
#[error("Unknown matchType: {0}")]
pub struct UnknownMatchType(pub String);

impl std::str::FromStr for MatchType {
    type Err = UnknownMatchType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "domain" => Ok(Self::Domain),
            "glob" => Ok(Self::Glob),
            "regex" => Ok(Self::Regex),
            other => Err(UnknownMatchType(other.to_string())),
        }
    }
}

// =============================================================================
// Rule Types (semantic effect of a match)
// =============================================================================

/// Semantic effect of a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RuleType {
    /// Route the navigation into the rule's container
    Include,
    /// Suppress routing for matching URLs
    Exclude,
    /// Confine the rule's container to its matching URLs
    Restrict,
}

impl RuleType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::Restrict => "restrict",
        }
    }
}

/// Error for parsing a ruleType from its wire spelling.
#[derive(Debug, thiserror::Error)]
#[error("Unknown ruleType: {0}")]
pub struct UnknownRuleType(pub String);

impl std::str::FromStr for RuleType {
    type Err = UnknownRuleType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            "restrict" => Ok(Self::Restrict),
            other => Err(UnknownRuleType(other.to_string())),
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RuleSource {
    User,
    Preset,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RuleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RuleSource>,
}

/// A routing rule: pattern + grammar + effect + target container + priority.
///
/// `pattern` must be valid for `match_type`; the stores reject invalid
/// patterns at create/update time, so resolution never sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Rule {
    pub id: String,
    pub pattern: String,
    pub match_type: MatchType,
    pub rule_type: RuleType,
    /// Target container's cookieStoreId
    pub container_id: String,
    /// Higher wins; duplicates allowed
    pub priority: i32,
    pub enabled: bool,
    #[serde(default)]
    pub metadata: RuleMetadata,
}

// =============================================================================
// Containers
// =============================================================================

/// Whether a container outlives its last tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum ContainerLifetime {
    #[default]
    Permanent,
    UntilLastTab,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContainerMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub lifetime: ContainerLifetime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An isolated browsing identity with its own cookie/storage jar.
///
/// `cookie_store_id` is the stable external identity rules reference; it is
/// globally unique and immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Container {
    pub cookie_store_id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    /// Garbage-collected by the lifecycle manager when its last tab closes
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub metadata: ContainerMetadata,
}

// =============================================================================
// Resolution Result
// =============================================================================

/// Outcome of resolving one navigation against the rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "lowercase")]
#[ts(export)]
pub enum Resolution {
    /// Navigation belongs inside the named container
    #[serde(rename_all = "camelCase")]
    Route { container_id: String },
    /// No rule applies; the caller keeps the current/default container
    None,
    /// A restrict rule forbids this navigation from the current container
    Blocked,
}

impl Resolution {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked)
    }
}
