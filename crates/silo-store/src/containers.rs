//! Container registry
//!
//! CRUD over container records, keyed by `cookieStoreId`. The id is the
//! stable external identity rules and bookmark pins reference; it is unique
//! and immutable once created. Listing preserves creation order.

use std::collections::HashSet;

use serde::Deserialize;

use silo_core::types::ContainerMetadata;
use silo_core::Container;

use crate::StoreError;

/// Partial update for a container. `cookieStoreId` is immutable and has no
/// slot here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub temporary: Option<bool>,
    pub sync_enabled: Option<bool>,
    pub metadata: Option<ContainerMetadata>,
}

#[derive(Default)]
pub struct ContainerRegistry {
    containers: Vec<Container>,
    ids: HashSet<String>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers in creation order.
    pub fn list(&self) -> &[Container] {
        &self.containers
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn get(&self, cookie_store_id: &str) -> Option<&Container> {
        self.containers
            .iter()
            .find(|container| container.cookie_store_id == cookie_store_id)
    }

    pub fn contains(&self, cookie_store_id: &str) -> bool {
        self.ids.contains(cookie_store_id)
    }

    /// The live id set, shared with the resolver so rules referencing a
    /// deleted container go inert.
    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn create(&mut self, container: Container) -> Result<(), StoreError> {
        if container.cookie_store_id.trim().is_empty() {
            return Err(StoreError::InvalidContainer(
                "cookieStoreId must not be empty".into(),
            ));
        }
        if container.name.trim().is_empty() {
            return Err(StoreError::InvalidContainer("name must not be empty".into()));
        }
        if self.ids.contains(&container.cookie_store_id) {
            return Err(StoreError::DuplicateContainer(container.cookie_store_id));
        }
        log::debug!("container {} created", container.cookie_store_id);
        self.ids.insert(container.cookie_store_id.clone());
        self.containers.push(container);
        Ok(())
    }

    pub fn update(
        &mut self,
        cookie_store_id: &str,
        patch: ContainerPatch,
    ) -> Result<Container, StoreError> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::InvalidContainer("name must not be empty".into()));
            }
        }
        let container = self
            .containers
            .iter_mut()
            .find(|container| container.cookie_store_id == cookie_store_id)
            .ok_or_else(|| StoreError::UnknownContainer(cookie_store_id.to_string()))?;

        if let Some(name) = patch.name {
            container.name = name;
        }
        if let Some(color) = patch.color {
            container.color = color;
        }
        if let Some(icon) = patch.icon {
            container.icon = icon;
        }
        if let Some(temporary) = patch.temporary {
            container.temporary = temporary;
        }
        if let Some(sync_enabled) = patch.sync_enabled {
            container.sync_enabled = sync_enabled;
        }
        if let Some(metadata) = patch.metadata {
            container.metadata = metadata;
        }
        Ok(container.clone())
    }

    pub fn delete(&mut self, cookie_store_id: &str) -> Result<Container, StoreError> {
        let idx = self
            .containers
            .iter()
            .position(|container| container.cookie_store_id == cookie_store_id)
            .ok_or_else(|| StoreError::UnknownContainer(cookie_store_id.to_string()))?;
        let removed = self.containers.remove(idx);
        self.ids.remove(cookie_store_id);
        log::debug!("container {cookie_store_id} deleted");
        Ok(removed)
    }
}
