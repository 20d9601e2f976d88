//! Compiled-pattern cache
//!
//! The same rule set is evaluated once per navigation, possibly many times a
//! second; compiling globs and regexes on every call would dominate the hot
//! path. Entries are keyed by a 64-bit xxHash of `(matchType, pattern)`.
//! Failures are cached too, so a rule whose pattern no longer compiles
//! cannot trigger a recompilation storm.

use std::collections::HashMap;
use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::pattern::CompiledPattern;
use crate::types::MatchType;

#[derive(Default)]
pub struct PatternCache {
    entries: HashMap<u64, Option<CompiledPattern>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compiled pattern for `(pattern, match_type)`, compiling on first use.
    /// `None` means the pattern does not compile; the failure is cached.
    pub fn get(&mut self, pattern: &str, match_type: MatchType) -> Option<&CompiledPattern> {
        self.entries
            .entry(cache_key(pattern, match_type))
            .or_insert_with(|| match CompiledPattern::compile(pattern, match_type) {
                Ok(compiled) => Some(compiled),
                Err(err) => {
                    log::warn!("pattern {pattern:?} ({}) failed to compile: {err}", match_type.as_str());
                    None
                }
            })
            .as_ref()
    }

    /// Drop the entry for a pattern; called when a rule is edited or deleted.
    pub fn invalidate(&mut self, pattern: &str, match_type: MatchType) {
        self.entries.remove(&cache_key(pattern.trim(), match_type));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn cache_key(pattern: &str, match_type: MatchType) -> u64 {
    let mut hasher = XxHash64::with_seed(match_type as u64);
    hasher.write(pattern.trim().as_bytes());
    hasher.finish()
}
