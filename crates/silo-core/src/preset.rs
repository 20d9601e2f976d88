//! Preset planning
//!
//! A preset bundles a container template with rule templates and is applied
//! in bulk. Planning compares identity keys against the target container's
//! existing rules (and earlier templates in the same preset), so re-applying
//! a preset never inserts duplicates; it reports them as skipped instead.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::identity::identity_keys;
use crate::types::{MatchType, Rule, RuleMetadata, RuleSource, RuleType};

// =============================================================================
// Preset shapes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresetRule {
    pub pattern: String,
    pub match_type: MatchType,
    pub rule_type: RuleType,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ContainerTemplate {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Preset {
    pub name: String,
    pub container: ContainerTemplate,
    pub rules: Vec<PresetRule>,
}

/// Outcome of planning a preset against a container's existing rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresetPlan {
    pub to_create: Vec<Rule>,
    pub to_skip: Vec<PresetRule>,
}

// =============================================================================
// Planning
// =============================================================================

/// Split a preset's templates into rules to create and duplicates to skip.
///
/// Pure apart from `next_id`, which supplies ids for the created rules; no
/// state is mutated, so callers can show the plan for review before applying.
pub fn plan(
    preset: &Preset,
    container_id: &str,
    existing: &[Rule],
    mut next_id: impl FnMut() -> String,
) -> PresetPlan {
    let mut seen: HashSet<String> = existing
        .iter()
        .filter(|rule| rule.container_id == container_id)
        .flat_map(|rule| identity_keys(&rule.pattern, rule.match_type, rule.rule_type, container_id))
        .collect();

    let mut to_create = Vec::new();
    let mut to_skip = Vec::new();

    for template in &preset.rules {
        let keys = identity_keys(
            &template.pattern,
            template.match_type,
            template.rule_type,
            container_id,
        );
        if keys.iter().any(|key| seen.contains(key)) {
            to_skip.push(template.clone());
            continue;
        }
        seen.extend(keys);

        to_create.push(Rule {
            id: next_id(),
            pattern: template.pattern.trim().to_string(),
            match_type: template.match_type,
            rule_type: template.rule_type,
            container_id: container_id.to_string(),
            priority: template.priority,
            enabled: true,
            metadata: RuleMetadata {
                description: template.description.clone(),
                source: Some(RuleSource::Preset),
            },
        });
    }

    PresetPlan { to_create, to_skip }
}

#[cfg(test)]
mod tests {
    use super::*;

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
                    description: Some("keep banking inside".into()),
                },
            ],
        }
    }

    fn id_source() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("preset-{n}")
        }
    }

    #[test]
    fn first_application_creates_everything() {
        let preset = banking_preset();
        let plan = plan(&preset, "bank", &[], id_source());
        assert_eq!(plan.to_create.len(), 2);
        assert!(plan.to_skip.is_empty());
        assert!(plan
            .to_create
            .iter()
            .all(|rule| rule.metadata.source == Some(RuleSource::Preset)));
        assert!(plan.to_create.iter().all(|rule| rule.container_id == "bank"));
    }

    #[test]
    fn second_application_skips_everything() {
        let preset = banking_preset();
        let first = plan(&preset, "bank", &[], id_source());
        let second = plan(&preset, "bank", &first.to_create, id_source());
        assert!(second.to_create.is_empty());
        assert_eq!(second.to_skip.len(), preset.rules.len());
    }

    #[test]
    fn only_target_container_rules_count_as_duplicates() {
        let preset = banking_preset();
        let elsewhere = plan(&preset, "other", &[], id_source());
        let here = plan(&preset, "bank", &elsewhere.to_create, id_source());
        assert_eq!(here.to_create.len(), 2);
    }

    #[test]
    fn duplicate_templates_within_a_preset_collapse() {
        let mut preset = banking_preset();
        preset.rules.push(preset.rules[0].clone());
        let plan = plan(&preset, "bank", &[], id_source());
        assert_eq!(plan.to_create.len(), 2);
        assert_eq!(plan.to_skip.len(), 1);
    }
}
