//! Combined store facade
//!
//! The single entry object the background service and options UI talk to:
//! container registry + rule store + the cached resolver, with cascade
//! deletion, id allocation, and preset application. Deleting a container
//! removes its rules in the same logical operation, so `list()`/`resolve()`
//! callers never observe a rule referencing a container deleted in that
//! transaction.

use std::collections::HashSet;

use serde::Deserialize;

use silo_core::pattern::CompiledPattern;
use silo_core::preset::{plan, Preset, PresetRule};
use silo_core::types::{ContainerMetadata, RuleMetadata};
use silo_core::{
    suggest_match_type, Container, MatchType, PatternError, Resolution, ResolveContext, Rule,
    RuleType,
};

use crate::containers::{ContainerPatch, ContainerRegistry};
use crate::store::{RulePatch, RuleStore};
use crate::StoreError;

/// A rule as submitted by the UI; the store allocates the id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub pattern: String,
    pub match_type: MatchType,
    pub rule_type: RuleType,
    pub container_id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: RuleMetadata,
}

fn default_enabled() -> bool {
    true
}

/// Outcome of applying a preset.
#[derive(Debug, Clone)]
pub struct PresetApplied {
    pub container_id: String,
    pub created: Vec<Rule>,
    pub skipped: Vec<PresetRule>,
}

#[derive(Default)]
pub struct SiloStore {
    containers: ContainerRegistry,
    rules: RuleStore,
    next_rule_id: u64,
    next_container_id: u64,
}

impl SiloStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load persisted state. Lenient: an invalid record is dropped with
    /// a warning instead of failing startup; create/update stay strict so
    /// bad records are never persisted in the first place. Rules referencing
    /// an unknown container are kept; the resolver treats them as inert
    /// until the container reappears or the cascade removes them.
    pub fn from_parts(containers: Vec<Container>, rules: Vec<Rule>) -> Self {
        let mut store = Self::new();
        for container in containers {
            let id = container.cookie_store_id.clone();
            if let Err(err) = store.containers.create(container) {
                log::warn!("dropping persisted container {id:?}: {err}");
            }
        }
        for rule in rules {
            let id = rule.id.clone();
            if let Err(err) = store.rules.create(rule) {
                log::warn!("dropping persisted rule {id:?}: {err}");
            }
        }
        store
    }

    // -------------------------------------------------------------------------
    // Containers
    // -------------------------------------------------------------------------

    pub fn containers(&self) -> &[Container] {
        self.containers.list()
    }

    pub fn container(&self, cookie_store_id: &str) -> Option<&Container> {
        self.containers.get(cookie_store_id)
    }

    pub fn live_container_ids(&self) -> &HashSet<String> {
        self.containers.ids()
    }

    pub fn create_container(&mut self, container: Container) -> Result<(), StoreError> {
        self.containers.create(container)
    }

    pub fn update_container(
        &mut self,
        cookie_store_id: &str,
        patch: ContainerPatch,
    ) -> Result<Container, StoreError> {
        self.containers.update(cookie_store_id, patch)
    }

    /// Delete a container and cascade to every rule targeting it. Returns
    /// the removed rules.
    pub fn delete_container(&mut self, cookie_store_id: &str) -> Result<Vec<Rule>, StoreError> {
        self.containers.delete(cookie_store_id)?;
        let removed = self.rules.remove_for_container(cookie_store_id);
        log::debug!(
            "container {cookie_store_id} deleted, cascade removed {} rule(s)",
            removed.len()
        );
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Rules
    // -------------------------------------------------------------------------

    pub fn rules(&self) -> &[Rule] {
        self.rules.list()
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Validate a draft and insert it with a freshly allocated id. The
    /// target container must exist.
    pub fn create_rule(&mut self, draft: RuleDraft) -> Result<Rule, StoreError> {
        if !self.containers.contains(&draft.container_id) {
            return Err(StoreError::UnknownContainer(draft.container_id));
        }
        let rule = Rule {
            id: self.alloc_rule_id(),
            pattern: draft.pattern,
            match_type: draft.match_type,
            rule_type: draft.rule_type,
            container_id: draft.container_id,
            priority: draft.priority,
            enabled: draft.enabled,
            metadata: draft.metadata,
        };
        self.rules.create(rule.clone())?;
        Ok(rule)
    }

    pub fn update_rule(&mut self, id: &str, patch: RulePatch) -> Result<Rule, StoreError> {
        if let Some(container_id) = &patch.container_id {
            if !self.containers.contains(container_id) {
                return Err(StoreError::UnknownContainer(container_id.clone()));
            }
        }
        self.rules.update(id, patch)
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<Rule, StoreError> {
        self.rules.delete(id)
    }

    pub fn test_pattern(
        &self,
        url: &str,
        pattern: &str,
        match_type: MatchType,
    ) -> Result<bool, PatternError> {
        self.rules.test_pattern(url, pattern, match_type)
    }

    pub fn suggest_match_type(&self, pattern: &str) -> MatchType {
        suggest_match_type(pattern)
    }

    pub fn find_duplicate(
        &self,
        pattern: &str,
        match_type: MatchType,
        rule_type: RuleType,
        container_id: &str,
    ) -> Option<&Rule> {
        self.rules
            .find_duplicate(pattern, match_type, rule_type, container_id)
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// The background service's entry point: resolve a navigation against
    /// the current rule set, with rules targeting deleted containers inert.
    pub fn resolve(&mut self, url: &str, current_container: Option<&str>) -> Resolution {
        let ctx = ResolveContext {
            current_container,
            live_containers: Some(self.containers.ids()),
        };
        self.rules.resolve(url, &ctx)
    }

    // -------------------------------------------------------------------------
    // Presets
    // -------------------------------------------------------------------------

    /// Apply a preset. With a target container the preset's rules land
    /// there; without one a container is created from the preset's template.
    /// Every template pattern is validated before anything is created, so a
    /// bad preset leaves the store untouched. Duplicates (by identity key)
    /// are reported as skipped, never inserted twice.
    pub fn apply_preset(
        &mut self,
        preset: &Preset,
        target_container: Option<&str>,
    ) -> Result<PresetApplied, StoreError> {
        for template in &preset.rules {
            CompiledPattern::compile(&template.pattern, template.match_type)?;
        }

        let container_id = match target_container {
            Some(id) => {
                if !self.containers.contains(id) {
                    return Err(StoreError::UnknownContainer(id.to_string()));
                }
                id.to_string()
            }
            None => {
                let id = self.alloc_container_id();
                self.containers.create(Container {
                    cookie_store_id: id.clone(),
                    name: preset.container.name.clone(),
                    color: preset.container.color.clone(),
                    icon: preset.container.icon.clone(),
                    temporary: false,
                    sync_enabled: false,
                    metadata: ContainerMetadata::default(),
                })?;
                id
            }
        };

        let mut next = self.next_rule_id;
        let rules = &self.rules;
        let planned = plan(preset, &container_id, rules.list(), || loop {
            next += 1;
            let id = format!("rule-{next}");
            if rules.get(&id).is_none() {
                return id;
            }
        });
        self.next_rule_id = next;

        for rule in &planned.to_create {
            self.rules.create(rule.clone())?;
        }
        log::debug!(
            "preset {:?} applied to {container_id}: {} created, {} skipped",
            preset.name,
            planned.to_create.len(),
            planned.to_skip.len()
        );

        Ok(PresetApplied {
            container_id,
            created: planned.to_create,
            skipped: planned.to_skip,
        })
    }

    // -------------------------------------------------------------------------
    // Id allocation
    // -------------------------------------------------------------------------

    fn alloc_rule_id(&mut self) -> String {
        loop {
            self.next_rule_id += 1;
            let id = format!("rule-{}", self.next_rule_id);
            if self.rules.get(&id).is_none() {
                return id;
            }
        }
    }

    fn alloc_container_id(&mut self) -> String {
        loop {
            self.next_container_id += 1;
            let id = format!("silo-container-{}", self.next_container_id);
            if !self.containers.contains(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silo_core::preset::ContainerTemplate;

    fn container(id: &str, name: &str) -> Container {
        Container {
            cookie_store_id: id.into(),
            name: name.into(),
            color: String::new(),
            icon: String::new(),
            temporary: false,
            sync_enabled: false,
            metadata: ContainerMetadata::default(),
        }
    }

    fn draft(pattern: &str, match_type: MatchType, container: &str, priority: i32) -> RuleDraft {
        RuleDraft {
            pattern: pattern.into(),
            match_type,
            rule_type: RuleType::Include,
            container_id: container.into(),
            priority,
            enabled: true,
            metadata: RuleMetadata::default(),
        }
    }

    fn store_with_work_container() -> SiloStore {
        let mut store = SiloStore::new();
        store.create_container(container("work", "Work")).unwrap();
        store
    }

    #[test]
    fn create_rule_allocates_ids_and_requires_a_container() {
        let mut store = store_with_work_container();
        let rule = store
            .create_rule(draft("example.com", MatchType::Domain, "work", 5))
            .unwrap();
        assert_eq!(rule.id, "rule-1");

        assert!(matches!(
            store.create_rule(draft("other.com", MatchType::Domain, "nope", 5)),
            Err(StoreError::UnknownContainer(_))
        ));
    }

    #[test]
    fn resolve_routes_into_the_stored_container() {
        let mut store = store_with_work_container();
        store
            .create_rule(draft("*.example.com", MatchType::Domain, "work", 5))
            .unwrap();
        assert_eq!(
            store.resolve("https://sub.example.com/x", None),
            Resolution::Route {
                container_id: "work".into()
            }
        );
        assert_eq!(store.resolve("https://elsewhere.com/", None), Resolution::None);
    }

    #[test]
    fn deleting_a_container_cascades_and_resolution_degrades_to_none() {
        let mut store = store_with_work_container();
        store
            .create_rule(draft("*.example.com", MatchType::Domain, "work", 5))
            .unwrap();

        let removed = store.delete_container("work").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(store.rules().is_empty());
        assert_eq!(store.resolve("https://sub.example.com/x", None), Resolution::None);
    }

    #[test]
    fn persisted_rule_for_deleted_container_is_inert_not_an_error() {
        // Transient state: the rule survived persistence but its container
        // did not. from_parts keeps it; resolution ignores it.
        let rule = Rule {
            id: "r1".into(),
            pattern: "example.com".into(),
            match_type: MatchType::Domain,
            rule_type: RuleType::Include,
            container_id: "gone".into(),
            priority: 5,
            enabled: true,
            metadata: RuleMetadata::default(),
        };
        let mut store = SiloStore::from_parts(vec![container("work", "Work")], vec![rule]);
        assert_eq!(store.rules().len(), 1);
        assert_eq!(store.resolve("https://example.com/", None), Resolution::None);
    }

    #[test]
    fn from_parts_drops_invalid_records() {
        let bad_rule = Rule {
            id: "r1".into(),
            pattern: "(unclosed".into(),
            match_type: MatchType::Regex,
            rule_type: RuleType::Include,
            container_id: "work".into(),
            priority: 5,
            enabled: true,
            metadata: RuleMetadata::default(),
        };
        let store = SiloStore::from_parts(
            vec![container("work", "Work"), container("work", "Duplicate")],
            vec![bad_rule],
        );
        assert_eq!(store.containers().len(), 1);
        assert!(store.rules().is_empty());
    }

    fn banking_preset() -> Preset {
        Preset {
            name: "Banking".into(),
            container: ContainerTemplate {
                name: "Banking".into(),
                color: "green".into(),
                icon: "dollar".into(),
            },
            rules: vec![
                PresetRule {
                    pattern: "*.bank.example".into(),
                    match_type: MatchType::Domain,
                    rule_type: RuleType::Include,
                    priority: 10,
                    description: None,
                },
                PresetRule {
                    pattern: "https://bank.example/*".into(),
                    match_type: MatchType::Glob,
                    rule_type: RuleType::Restrict,
                    priority: 0,
                    description: None,
                },
            ],
        }
    }

    #[test]
    fn applying_a_preset_twice_creates_nothing_the_second_time() {
        let mut store = SiloStore::new();
        let first = store.apply_preset(&banking_preset(), None).unwrap();
        assert_eq!(first.created.len(), 2);
        assert!(first.skipped.is_empty());
        assert_eq!(store.containers().len(), 1);

        let second = store
            .apply_preset(&banking_preset(), Some(&first.container_id))
            .unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.skipped.len(), 2);
        assert_eq!(store.rules().len(), 2);
    }

    #[test]
    fn preset_with_a_bad_rule_leaves_the_store_untouched() {
        let mut store = store_with_work_container();
        let mut preset = banking_preset();
        preset.rules.push(PresetRule {
            pattern: "(unclosed".into(),
            match_type: MatchType::Regex,
            rule_type: RuleType::Include,
            priority: 0,
            description: None,
        });

        assert!(store.apply_preset(&preset, Some("work")).is_err());
        assert!(store.rules().is_empty());

        // Without a target, not even the container gets created
        let mut fresh = SiloStore::new();
        assert!(fresh.apply_preset(&preset, None).is_err());
        assert!(fresh.containers().is_empty());
    }

    #[test]
    fn preset_into_unknown_container_errors() {
        let mut store = SiloStore::new();
        assert!(matches!(
            store.apply_preset(&banking_preset(), Some("nope")),
            Err(StoreError::UnknownContainer(_))
        ));
    }

    #[test]
    fn restricted_container_blocks_foreign_urls() {
        let mut store = SiloStore::new();
        let applied = store.apply_preset(&banking_preset(), None).unwrap();

        assert_eq!(
            store.resolve("https://other.example/", Some(&applied.container_id)),
            Resolution::Blocked
        );
        assert_ne!(
            store.resolve("https://bank.example/login", Some(&applied.container_id)),
            Resolution::Blocked
        );
    }

    #[test]
    fn rule_ids_never_collide_with_loaded_rules() {
        let seeded = Rule {
            id: "rule-1".into(),
            pattern: "seeded.example".into(),
            match_type: MatchType::Domain,
            rule_type: RuleType::Include,
            container_id: "work".into(),
            priority: 1,
            enabled: true,
            metadata: RuleMetadata::default(),
        };
        let mut store = SiloStore::from_parts(vec![container("work", "Work")], vec![seeded]);
        let created = store
            .create_rule(draft("fresh.example", MatchType::Domain, "work", 1))
            .unwrap();
        assert_ne!(created.id, "rule-1");
    }
}
