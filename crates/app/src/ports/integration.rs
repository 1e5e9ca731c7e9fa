//! Integration port: lifecycle and service-call handling for device integrations.
//!
//! An integration bridges an external system (here the Evnex cloud) into the
//! host. It registers devices and entities on startup, keeps them current in
//! the background, and handles service calls directed at entities it owns.

use std::future::Future;

use evnex_bridge_domain::device::Device;
use evnex_bridge_domain::entity::Entity;
use evnex_bridge_domain::error::BridgeError;
use evnex_bridge_domain::id::EntityId;

use super::EntityRegistry;

/// Context provided to integrations for persisting what they expose.
///
/// This is a **port**: integrations call it to register devices and
/// entities. The binary crate provides a concrete implementation.
pub trait IntegrationContext: EntityRegistry + Send + Sync {
    /// Persist a device (create or update by `integration`+`unique_id`).
    fn upsert_device(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Device, BridgeError>> + Send;

    /// Persist an entity (create or update by `integration`+`unique_id`).
    ///
    /// The returned entity carries the registry's [`EntityId`], which stays
    /// stable across upserts.
    fn upsert_entity(
        &self,
        entity: Entity,
    ) -> impl Future<Output = Result<Entity, BridgeError>> + Send;

    /// Convenience: persist a full [`DiscoveredDevice`] (device + all entities).
    fn persist_discovered(
        &self,
        dd: DiscoveredDevice,
    ) -> impl Future<Output = Result<Vec<Entity>, BridgeError>> + Send {
        async move {
            let device = self.upsert_device(dd.device).await?;
            let mut stored = Vec::with_capacity(dd.entities.len());
            for mut entity in dd.entities {
                entity.device_id = device.id;
                stored.push(self.upsert_entity(entity).await?);
            }
            Ok(stored)
        }
    }
}

/// A pluggable device integration.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup): first refresh and registration
/// 2. [`start_background`](Self::start_background): spawn long-running tasks
/// 3. (the host runs, forwarding service calls via [`handle_service_call`](Self::handle_service_call))
/// 4. [`teardown`](Self::teardown): clean up resources
pub trait Integration {
    /// Unique name identifying this integration (e.g. `"evnex"`).
    fn name(&self) -> &'static str;

    /// Initialise and register everything known after a first refresh.
    fn setup(
        &mut self,
        ctx: &impl IntegrationContext,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Start long-running background work.
    ///
    /// Spawns internal tasks that keep registrations current via `ctx` and
    /// returns immediately.
    fn start_background(
        &mut self,
        _ctx: impl IntegrationContext + Clone + 'static,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async { Ok(()) }
    }

    /// Handle a service call (e.g. `turn_on`, `set_value`, `press`) for an
    /// entity owned by this integration.
    ///
    /// Returns the new [`Entity`] state after handling the call.
    fn handle_service_call(
        &self,
        entity_id: EntityId,
        service: &str,
        data: serde_json::Value,
    ) -> impl Future<Output = Result<Entity, BridgeError>> + Send;

    /// Called on graceful shutdown. Clean up any background tasks or connections.
    fn teardown(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

/// A device and the entities it exposes.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub device: Device,
    pub entities: Vec<Entity>,
}
