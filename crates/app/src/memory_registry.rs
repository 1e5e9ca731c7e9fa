//! In-process entity and device registry.
//!
//! Stands in for the host's registries: devices and entities are upserted by
//! `(integration, unique_id)`, keeping their ids stable across refreshes.
//! Records seen for the first time get ids derived from that key. Clones
//! share the same storage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use evnex_bridge_domain::device::Device;
use evnex_bridge_domain::entity::Entity;
use evnex_bridge_domain::error::{BridgeError, NotFoundError, ValidationError};
use evnex_bridge_domain::id::{DeviceId, EntityId};
use tracing::debug;

use crate::ports::{EntityRegistry, IntegrationContext};

#[derive(Debug, Default)]
struct Inner {
    devices: HashMap<DeviceId, Device>,
    entities: HashMap<EntityId, Entity>,
    schema_versions: HashMap<String, u32>,
}

impl Inner {
    fn entity_by_unique_id(&self, integration: &str, unique_id: &str) -> Option<&Entity> {
        self.entities
            .values()
            .find(|e| e.integration == integration && e.unique_id == unique_id)
    }
}

/// Shared in-memory registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every registered entity, ordered by `entity_id`.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.read().entities.values().cloned().collect();
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        entities
    }

    /// Every registered device, ordered by name.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.read().devices.values().cloned().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        self.read().entities.get(&id).cloned()
    }

    /// Look up an entity by its human-facing `entity_id`.
    #[must_use]
    pub fn find_by_entity_id(&self, entity_id: &str) -> Option<Entity> {
        self.read()
            .entities
            .values()
            .find(|e| e.entity_id == entity_id)
            .cloned()
    }

    /// Register an entity as-is, as if left behind by an older release.
    pub fn insert_entity(&self, entity: Entity) {
        self.write().entities.insert(entity.id, entity);
    }
}

impl EntityRegistry for InMemoryRegistry {
    async fn entities_of(&self, integration: &str) -> Result<Vec<Entity>, BridgeError> {
        Ok(self
            .entities()
            .into_iter()
            .filter(|e| e.integration == integration)
            .collect())
    }

    async fn find_by_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> Result<Option<Entity>, BridgeError> {
        Ok(self
            .read()
            .entity_by_unique_id(integration, unique_id)
            .cloned())
    }

    async fn rename_unique_id(
        &self,
        id: EntityId,
        unique_id: String,
    ) -> Result<Entity, BridgeError> {
        if unique_id.is_empty() {
            return Err(ValidationError::EmptyUniqueId.into());
        }
        let mut inner = self.write();
        let entity = inner.entities.get_mut(&id).ok_or_else(|| NotFoundError {
            entity: "Entity",
            id: id.to_string(),
        })?;
        entity.unique_id = unique_id;
        Ok(entity.clone())
    }

    async fn schema_version(&self, integration: &str) -> Result<u32, BridgeError> {
        Ok(self
            .read()
            .schema_versions
            .get(integration)
            .copied()
            .unwrap_or_default())
    }

    async fn set_schema_version(&self, integration: &str, version: u32) -> Result<(), BridgeError> {
        self.write()
            .schema_versions
            .insert(integration.to_string(), version);
        Ok(())
    }
}

impl IntegrationContext for InMemoryRegistry {
    async fn upsert_device(&self, mut device: Device) -> Result<Device, BridgeError> {
        device.validate()?;
        let mut inner = self.write();
        let existing = inner
            .devices
            .values()
            .find(|d| d.integration == device.integration && d.unique_id == device.unique_id)
            .map(|d| d.id);
        if let Some(id) = existing {
            device.id = id;
        } else {
            device.id = DeviceId::derived(&device.integration, &device.unique_id);
            debug!(name = %device.name, id = %device.id, "Registering device");
        }
        inner.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn upsert_entity(&self, mut entity: Entity) -> Result<Entity, BridgeError> {
        entity.validate()?;
        let mut inner = self.write();
        let existing = inner
            .entity_by_unique_id(&entity.integration, &entity.unique_id)
            .cloned();
        match existing {
            Some(mut stored) => {
                stored.device_id = entity.device_id;
                stored.friendly_name = entity.friendly_name;
                stored.attributes = entity.attributes;
                stored.update_state(entity.state, entity.last_updated);
                inner.entities.insert(stored.id, stored.clone());
                Ok(stored)
            }
            None => {
                entity.id = EntityId::derived(&entity.integration, &entity.unique_id);
                debug!(entity_id = %entity.entity_id, "Registering entity");
                inner.entities.insert(entity.id, entity.clone());
                Ok(entity)
            }
        }
    }
}
