//! Silo Core Library
//!
//! Core rule-matching and container-resolution engine for the Silo
//! multi-container extension. Given a navigation URL and the active routing
//! rules, it decides which isolated identity container the navigation
//! belongs to, whether no rule applies, or whether a restricted container
//! forbids the navigation outright.
//!
//! # Architecture
//!
//! The engine is synchronous and pure: `resolve` and pattern tests perform
//! no I/O and are safe to call once per navigation across every open tab.
//! Patterns compile once (at rule create/update time, memoized on the hot
//! path) and evaluate many times. All mutable state lives behind the store
//! layer; the resolver takes the current rule snapshot as an explicit
//! argument.
//!
//! # Modules
//!
//! - `types`: wire-level type definitions shared with the extension UI
//! - `nav`: the navigation URL, parsed once per resolution
//! - `pattern`: the four matching grammars and their compilation
//! - `cache`: compiled-pattern memoization for the hot path
//! - `identity`: duplicate-detection keys for rules
//! - `resolver`: the per-navigation decision procedure
//! - `preset`: bulk rule templates with duplicate skipping
//! - `bookmark`: container pin carried in a bookmark URL's query string

pub mod bookmark;
pub mod cache;
pub mod identity;
pub mod nav;
pub mod pattern;
pub mod preset;
pub mod resolver;
pub mod types;

// Re-export commonly used items
pub use cache::PatternCache;
pub use identity::identity_keys;
pub use nav::NavUrl;
pub use pattern::{suggest_match_type, test_pattern, CompiledPattern, PatternError};
pub use preset::{Preset, PresetPlan, PresetRule};
pub use resolver::{resolve, ResolveContext, Resolver};
pub use types::{Container, MatchType, Resolution, Rule, RuleType};
