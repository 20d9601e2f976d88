//! Silo Store Library
//!
//! Management layer in front of the resolution engine: the single owners of
//! the mutable rule list and container registry. All validation (rule shape,
//! pattern compilation, container references) happens here, before any state
//! change, so the hot path in `silo-core` only ever sees valid rules. Every
//! mutation presents its effects atomically: callers never observe a
//! half-applied priority re-sort or a partially validated update.
//!
//! # Modules
//!
//! - `store`: the rule store (sorted rule list, CRUD, pattern preview)
//! - `containers`: container registry keyed by immutable cookieStoreId
//! - `silo`: the combined facade the background service and UI talk to

pub mod containers;
pub mod silo;
pub mod store;

pub use containers::{ContainerPatch, ContainerRegistry};
pub use silo::{PresetApplied, RuleDraft, SiloStore};
pub use store::{RulePatch, RuleStore};

use silo_core::PatternError;

/// Store-level failures, surfaced synchronously to the creating/updating
/// caller. Resolution never raises these.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error("A rule with id {0:?} already exists")]
    DuplicateRuleId(String),
    #[error("No rule with id {0:?}")]
    UnknownRule(String),
    #[error("No container with cookieStoreId {0:?}")]
    UnknownContainer(String),
    #[error("A container with cookieStoreId {0:?} already exists")]
    DuplicateContainer(String),
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
    #[error("Invalid container: {0}")]
    InvalidContainer(String),
}
