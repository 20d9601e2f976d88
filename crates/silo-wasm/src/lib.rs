//! WebAssembly bindings for Silo
//!
//! Exposes the store facade to the extension's background service and
//! options UI. Wasm is single-threaded, so the store lives behind a
//! `thread_local` cell; `init` loads (or replaces) it from the persisted
//! container and rule payloads.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use silo_core::types::Resolution;
use silo_core::{bookmark, suggest_match_type as suggest, Container, MatchType, Rule, RuleType};
use silo_store::{ContainerPatch, RuleDraft, RulePatch, SiloStore};

thread_local! {
    static STORE: RefCell<Option<SiloStore>> = RefCell::new(None);
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("[silo {}] {}", record.level(), record.args());
        match record.level() {
            log::Level::Error | log::Level::Warn => {
                web_sys::console::warn_1(&JsValue::from_str(&line))
            }
            _ => web_sys::console::log_1(&JsValue::from_str(&line)),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn with_store<R>(f: impl FnOnce(&mut SiloStore) -> Result<R, JsValue>) -> Result<R, JsValue> {
    STORE.with(|cell| {
        let mut guard = cell.borrow_mut();
        let store = guard
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Store not initialized. Call init() first."))?;
        f(store)
    })
}

fn err_to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_match_type(match_type: &str) -> Result<MatchType, JsValue> {
    match_type.parse().map_err(err_to_js)
}

/// Load the store from persisted payloads, replacing any existing store.
/// Invalid persisted records are dropped with a console warning.
#[wasm_bindgen]
pub fn init(containers_json: &str, rules_json: &str) -> Result<(), JsValue> {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let containers: Vec<Container> = serde_json::from_str(containers_json)
        .map_err(|err| JsValue::from_str(&format!("Invalid containers payload: {err}")))?;
    let rules: Vec<Rule> = serde_json::from_str(rules_json)
        .map_err(|err| JsValue::from_str(&format!("Invalid rules payload: {err}")))?;

    let store = SiloStore::from_parts(containers, rules);
    STORE.with(|cell| *cell.borrow_mut() = Some(store));
    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    STORE.with(|cell| cell.borrow().is_some())
}

/// Resolve a navigation. Returns `{ kind: "route", containerId }`,
/// `{ kind: "none" }`, or `{ kind: "blocked" }`. An uninitialized store
/// resolves to `none` so the caller falls back to the current container.
#[wasm_bindgen]
pub fn resolve(url: &str, current_container: Option<String>) -> JsValue {
    let resolution = STORE.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .map(|store| store.resolve(url, current_container.as_deref()))
    });

    let result = js_sys::Object::new();
    match resolution {
        Some(Resolution::Route { container_id }) => {
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &"route".into());
            let _ = js_sys::Reflect::set(&result, &"containerId".into(), &container_id.into());
        }
        Some(Resolution::Blocked) => {
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &"blocked".into());
        }
        Some(Resolution::None) | None => {
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &"none".into());
        }
    }
    result.into()
}

/// Pattern preview for the options UI; does not require an initialized store.
#[wasm_bindgen]
pub fn test_pattern(url: &str, pattern: &str, match_type: &str) -> Result<bool, JsValue> {
    let match_type = parse_match_type(match_type)?;
    silo_core::pattern::test_pattern(url, pattern, match_type).map_err(err_to_js)
}

#[wasm_bindgen]
pub fn suggest_match_type(pattern: &str) -> String {
    suggest(pattern).as_str().to_string()
}

// =============================================================================
// Containers
// =============================================================================

#[wasm_bindgen]
pub fn list_containers() -> Result<String, JsValue> {
    with_store(|store| serde_json::to_string(store.containers()).map_err(err_to_js))
}

#[wasm_bindgen]
pub fn create_container(container_json: &str) -> Result<(), JsValue> {
    let container: Container = serde_json::from_str(container_json).map_err(err_to_js)?;
    with_store(|store| store.create_container(container).map_err(err_to_js))
}

#[wasm_bindgen]
pub fn update_container(cookie_store_id: &str, patch_json: &str) -> Result<String, JsValue> {
    let patch: ContainerPatch = serde_json::from_str(patch_json).map_err(err_to_js)?;
    with_store(|store| {
        let updated = store.update_container(cookie_store_id, patch).map_err(err_to_js)?;
        serde_json::to_string(&updated).map_err(err_to_js)
    })
}

/// Delete a container and its rules. Returns the number of cascaded rules.
#[wasm_bindgen]
pub fn delete_container(cookie_store_id: &str) -> Result<u32, JsValue> {
    with_store(|store| {
        let removed = store.delete_container(cookie_store_id).map_err(err_to_js)?;
        Ok(removed.len() as u32)
    })
}

// =============================================================================
// Rules
// =============================================================================

#[wasm_bindgen]
pub fn list_rules() -> Result<String, JsValue> {
    with_store(|store| serde_json::to_string(store.rules()).map_err(err_to_js))
}

#[wasm_bindgen]
pub fn create_rule(draft_json: &str) -> Result<String, JsValue> {
    let draft: RuleDraft = serde_json::from_str(draft_json).map_err(err_to_js)?;
    with_store(|store| {
        let created = store.create_rule(draft).map_err(err_to_js)?;
        serde_json::to_string(&created).map_err(err_to_js)
    })
}

#[wasm_bindgen]
pub fn update_rule(id: &str, patch_json: &str) -> Result<String, JsValue> {
    let patch: RulePatch = serde_json::from_str(patch_json).map_err(err_to_js)?;
    with_store(|store| {
        let updated = store.update_rule(id, patch).map_err(err_to_js)?;
        serde_json::to_string(&updated).map_err(err_to_js)
    })
}

#[wasm_bindgen]
pub fn delete_rule(id: &str) -> Result<(), JsValue> {
    with_store(|store| store.delete_rule(id).map(|_| ()).map_err(err_to_js))
}

/// Id of an existing rule that duplicates the candidate, for the
/// rule-entry duplicate warning. `null` when there is none.
#[wasm_bindgen]
pub fn find_duplicate(
    pattern: &str,
    match_type: &str,
    rule_type: &str,
    container_id: &str,
) -> Result<Option<String>, JsValue> {
    let match_type = parse_match_type(match_type)?;
    let rule_type: RuleType = rule_type.parse().map_err(err_to_js)?;
    with_store(|store| {
        Ok(store
            .find_duplicate(pattern, match_type, rule_type, container_id)
            .map(|rule| rule.id.clone()))
    })
}

// =============================================================================
// Presets
// =============================================================================

/// Apply a preset. Returns `{ containerId, created, skipped, createdIds }`.
#[wasm_bindgen]
pub fn apply_preset(preset_json: &str, container_id: Option<String>) -> Result<JsValue, JsValue> {
    let preset: silo_core::Preset = serde_json::from_str(preset_json).map_err(err_to_js)?;
    let applied = with_store(|store| {
        store
            .apply_preset(&preset, container_id.as_deref())
            .map_err(err_to_js)
    })?;

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &result,
        &"containerId".into(),
        &applied.container_id.clone().into(),
    );
    let _ = js_sys::Reflect::set(
        &result,
        &"created".into(),
        &JsValue::from(applied.created.len() as u32),
    );
    let _ = js_sys::Reflect::set(
        &result,
        &"skipped".into(),
        &JsValue::from(applied.skipped.len() as u32),
    );

    let created_ids = js_sys::Array::new();
    for rule in &applied.created {
        created_ids.push(&JsValue::from_str(&rule.id));
    }
    let _ = js_sys::Reflect::set(&result, &"createdIds".into(), &created_ids);

    Ok(result.into())
}

// =============================================================================
// Bookmarks
// =============================================================================

#[wasm_bindgen]
pub fn bookmark_encode(url: &str, container_id: Option<String>) -> Result<String, JsValue> {
    bookmark::encode(url, container_id.as_deref()).map_err(err_to_js)
}

#[wasm_bindgen]
pub fn bookmark_decode(url: &str) -> Option<String> {
    bookmark::decode(url)
}

/// Cleaned URL when the bookmark pins a deleted container; `null` when the
/// pin is absent or still valid.
#[wasm_bindgen]
pub fn bookmark_prune(url: &str) -> Result<Option<String>, JsValue> {
    with_store(|store| Ok(bookmark::prune(url, store.live_container_ids())))
}
