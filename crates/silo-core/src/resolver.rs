//! Navigation resolution
//!
//! Decides, for one navigation URL and the current rule snapshot, which
//! container the navigation belongs to. This is the hot path: it runs once
//! per navigation, performs no I/O, and never fails: anomalies (a dangling
//! container reference, a pattern that no longer compiles) disable the
//! offending rule for this call only.
//!
//! Decision order:
//!
//! 1. Disabled rules and rules targeting dead containers are inert.
//! 2. If the current container carries any restrict rule, the navigation
//!    must match one of them or it is blocked.
//! 3. A matched exclude with priority >= the best matched include suppresses
//!    routing.
//! 4. Otherwise the best include wins: highest priority, then most specific
//!    grammar (exact > domain > glob > regex), then smallest rule id.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::cache::PatternCache;
use crate::nav::NavUrl;
use crate::pattern::CompiledPattern;
use crate::types::{Resolution, Rule, RuleType};

// =============================================================================
// Context
// =============================================================================

/// Read-only context for one resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    /// Container the navigating tab currently lives in, if any.
    pub current_container: Option<&'a str>,
    /// Live container ids. When set, rules referencing any other container
    /// are treated as disabled.
    pub live_containers: Option<&'a HashSet<String>>,
}

// =============================================================================
// Entry points
// =============================================================================

/// Resolve a navigation with no cross-call state.
///
/// Compiles every pattern on the fly; per-navigation callers should prefer
/// [`Resolver`], which memoizes compilation.
pub fn resolve(url: &str, rules: &[Rule], ctx: &ResolveContext<'_>) -> Resolution {
    let Ok(nav) = NavUrl::parse(url) else {
        return Resolution::None;
    };
    decide(&nav, rules, ctx, |rule| {
        match CompiledPattern::compile(&rule.pattern, rule.match_type) {
            Ok(compiled) => compiled.matches(&nav),
            Err(err) => {
                log::warn!("skipping rule {}: {err}", rule.id);
                false
            }
        }
    })
}

/// Resolver with a compiled-pattern cache, for the per-navigation hot path.
///
/// Holds no rule state: the rule snapshot is an explicit argument on every
/// call, and the cache only memoizes compilation.
#[derive(Default)]
pub struct Resolver {
    cache: PatternCache,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same decision procedure as [`resolve`], with memoized compilation.
    pub fn resolve(&mut self, url: &str, rules: &[Rule], ctx: &ResolveContext<'_>) -> Resolution {
        let Ok(nav) = NavUrl::parse(url) else {
            return Resolution::None;
        };
        let cache = &mut self.cache;
        decide(&nav, rules, ctx, |rule| {
            cache
                .get(&rule.pattern, rule.match_type)
                .map(|compiled| compiled.matches(&nav))
                .unwrap_or(false)
        })
    }

    /// Drop the cache entry for an edited or deleted rule's pattern.
    pub fn invalidate(&mut self, pattern: &str, match_type: crate::types::MatchType) {
        self.cache.invalidate(pattern, match_type);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

// =============================================================================
// Decision procedure
// =============================================================================

fn decide(
    nav: &NavUrl,
    rules: &[Rule],
    ctx: &ResolveContext<'_>,
    mut matches: impl FnMut(&Rule) -> bool,
) -> Resolution {
    let alive = |rule: &Rule| {
        ctx.live_containers
            .map_or(true, |live| live.contains(&rule.container_id))
    };

    // Whether the current container carries restrict rules at all; a
    // container with none is unrestricted.
    let mut current_is_restricted = false;
    let mut restrict_permits = false;
    let mut best_include: Option<&Rule> = None;
    let mut best_exclude_priority: Option<i32> = None;

    for rule in rules {
        if !rule.enabled || !alive(rule) {
            continue;
        }

        let targets_current = ctx.current_container == Some(rule.container_id.as_str());
        if rule.rule_type == RuleType::Restrict && targets_current {
            current_is_restricted = true;
        }

        if !matches(rule) {
            continue;
        }

        match rule.rule_type {
            RuleType::Restrict => {
                if targets_current {
                    restrict_permits = true;
                }
            }
            RuleType::Exclude => {
                best_exclude_priority =
                    Some(best_exclude_priority.map_or(rule.priority, |p| p.max(rule.priority)));
            }
            RuleType::Include => {
                if beats(best_include, rule) {
                    best_include = Some(rule);
                }
            }
        }
    }

    // Restrict check runs first and short-circuits
    if current_is_restricted && !restrict_permits {
        return Resolution::Blocked;
    }

    let Some(winner) = best_include else {
        return Resolution::None;
    };
    // Exclusion wins ties
    if best_exclude_priority.is_some_and(|priority| priority >= winner.priority) {
        return Resolution::None;
    }

    Resolution::Route {
        container_id: winner.container_id.clone(),
    }
}

/// Whether `candidate` beats the current best include.
fn beats(best: Option<&Rule>, candidate: &Rule) -> bool {
    let Some(best) = best else {
        return true;
    };
    match candidate.priority.cmp(&best.priority) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match candidate
            .match_type
            .specificity()
            .cmp(&best.match_type.specificity())
        {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => candidate.id < best.id,
        },
    }
}
