//! Rule store
//!
//! Single owner of the mutable rule list. The list is kept sorted by
//! priority descending with ties in insertion order, so `list()` callers
//! (the resolver among them) never re-sort. Validation runs in full before
//! any field is written; a failed create or update leaves the store exactly
//! as it was.

use serde::Deserialize;

use silo_core::pattern::{test_pattern, CompiledPattern};
use silo_core::types::RuleMetadata;
use silo_core::{
    identity_keys, MatchType, PatternError, Resolution, ResolveContext, Resolver, Rule, RuleType,
};

use crate::StoreError;

/// Partial update for a rule. Absent fields keep their current value;
/// `id` is immutable and has no slot here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RulePatch {
    pub pattern: Option<String>,
    pub match_type: Option<MatchType>,
    pub rule_type: Option<RuleType>,
    pub container_id: Option<String>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
    pub metadata: Option<RuleMetadata>,
}

/// The rule list plus the compiled-pattern cache for its hot path.
#[derive(Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
    resolver: Resolver,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rules, sorted by priority descending, ties by insertion order.
    pub fn list(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Validate and insert a rule. The pattern must compile for its grammar
    /// and the id must be unused; nothing is stored otherwise.
    pub fn create(&mut self, rule: Rule) -> Result<(), StoreError> {
        validate_shape(&rule)?;
        if self.get(&rule.id).is_some() {
            return Err(StoreError::DuplicateRuleId(rule.id));
        }
        CompiledPattern::compile(&rule.pattern, rule.match_type)?;

        let at = self.insertion_point(rule.priority);
        log::debug!("rule {} created (priority {})", rule.id, rule.priority);
        self.rules.insert(at, rule);
        Ok(())
    }

    /// Apply a patch to a rule. All checks run before any field is written.
    /// A priority change re-enters the order after existing rules of equal
    /// priority; ties among untouched rules never reorder.
    pub fn update(&mut self, id: &str, patch: RulePatch) -> Result<Rule, StoreError> {
        let idx = self
            .rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or_else(|| StoreError::UnknownRule(id.to_string()))?;

        let mut updated = self.rules[idx].clone();
        if let Some(pattern) = patch.pattern {
            updated.pattern = pattern;
        }
        if let Some(match_type) = patch.match_type {
            updated.match_type = match_type;
        }
        if let Some(rule_type) = patch.rule_type {
            updated.rule_type = rule_type;
        }
        if let Some(container_id) = patch.container_id {
            updated.container_id = container_id;
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(enabled) = patch.enabled {
            updated.enabled = enabled;
        }
        if let Some(metadata) = patch.metadata {
            updated.metadata = metadata;
        }

        validate_shape(&updated)?;
        let pattern_changed = updated.pattern != self.rules[idx].pattern
            || updated.match_type != self.rules[idx].match_type;
        if pattern_changed {
            CompiledPattern::compile(&updated.pattern, updated.match_type)?;
        }

        let old = self.rules.remove(idx);
        if pattern_changed {
            self.resolver.invalidate(&old.pattern, old.match_type);
        }
        let at = if updated.priority == old.priority {
            idx
        } else {
            self.insertion_point(updated.priority)
        };
        self.rules.insert(at, updated.clone());
        log::debug!("rule {id} updated");
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<Rule, StoreError> {
        let idx = self
            .rules
            .iter()
            .position(|rule| rule.id == id)
            .ok_or_else(|| StoreError::UnknownRule(id.to_string()))?;
        let removed = self.rules.remove(idx);
        self.resolver.invalidate(&removed.pattern, removed.match_type);
        log::debug!("rule {id} deleted");
        Ok(removed)
    }

    /// Remove every rule targeting a container; the cascade half of
    /// container deletion. Returns the removed rules.
    pub fn remove_for_container(&mut self, container_id: &str) -> Vec<Rule> {
        let mut removed = Vec::new();
        self.rules.retain(|rule| {
            if rule.container_id == container_id {
                removed.push(rule.clone());
                false
            } else {
                true
            }
        });
        for rule in &removed {
            self.resolver.invalidate(&rule.pattern, rule.match_type);
        }
        removed
    }

    /// Pattern preview for the UI: compile and test without creating a rule.
    pub fn test_pattern(
        &self,
        url: &str,
        pattern: &str,
        match_type: MatchType,
    ) -> Result<bool, PatternError> {
        test_pattern(url, pattern, match_type)
    }

    /// First existing rule that is a functional duplicate of the candidate,
    /// by identity-key overlap within the same container. Rule-entry UIs
    /// surface this as a warning before creating.
    pub fn find_duplicate(
        &self,
        pattern: &str,
        match_type: MatchType,
        rule_type: RuleType,
        container_id: &str,
    ) -> Option<&Rule> {
        let keys = identity_keys(pattern, match_type, rule_type, container_id);
        self.rules
            .iter()
            .filter(|rule| rule.container_id == container_id)
            .find(|rule| {
                identity_keys(&rule.pattern, rule.match_type, rule.rule_type, &rule.container_id)
                    .iter()
                    .any(|key| keys.contains(key))
            })
    }

    /// Resolve a navigation against the current rule list, with memoized
    /// pattern compilation.
    pub fn resolve(&mut self, url: &str, ctx: &ResolveContext<'_>) -> Resolution {
        self.resolver.resolve(url, &self.rules, ctx)
    }

    /// First index whose priority is below `priority`: new arrivals land
    /// after existing rules of equal priority.
    fn insertion_point(&self, priority: i32) -> usize {
        self.rules.partition_point(|rule| rule.priority >= priority)
    }
}

fn validate_shape(rule: &Rule) -> Result<(), StoreError> {
    if rule.id.trim().is_empty() {
        return Err(StoreError::InvalidRule("id must not be empty".into()));
    }
    if rule.pattern.trim().is_empty() {
        return Err(StoreError::InvalidRule("pattern must not be empty".into()));
    }
    if rule.container_id.trim().is_empty() {
        return Err(StoreError::InvalidRule(
            "containerId must not be empty".into(),
        ));
    }
    Ok(())
}
