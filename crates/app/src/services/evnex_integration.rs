//! The Evnex integration: refreshes the account and keeps the host's
//! devices and entities in step with each snapshot.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use evnex_bridge_domain::entity::{Entity, EntityState};
use evnex_bridge_domain::error::{BridgeError, NotFoundError};
use evnex_bridge_domain::id::{DeviceId, EntityId};
use evnex_bridge_domain::snapshot::Snapshot;
use evnex_bridge_domain::time::now;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use super::coordinator::{Coordinator, DataState};
use super::migration::migrate_entities;
use super::refresh::{RefreshError, RefreshService, RefreshSettings};
use crate::entities::{
    Command, DeviceIdentity, EntityBinding, INTEGRATION, RenderContext, bindings_for, command_for,
    execute, render,
};
use crate::ports::{
    ApiError, DiscoveredDevice, EvnexApi, Integration, IntegrationContext, TokenStore,
};

/// Settings of one configured Evnex account.
#[derive(Debug, Clone)]
pub struct EvnexSettings {
    /// Key under which session tokens are persisted.
    pub entry_id: String,
    pub poll_interval: Duration,
    /// Day window of the organisation insight fetch.
    pub insight_days: u32,
}

/// What has been registered with the host, shared with the background
/// publisher.
#[derive(Debug, Default)]
struct Published {
    bindings: RwLock<HashMap<EntityId, (EntityBinding, DeviceId)>>,
    /// Last value written to each number entity, by unique id.
    number_values: RwLock<HashMap<String, f64>>,
}

impl Published {
    fn binding(&self, id: EntityId) -> Option<(EntityBinding, DeviceId)> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn bindings(&self) -> Vec<(EntityId, EntityBinding, DeviceId)> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, (binding, device_id))| (*id, binding.clone(), *device_id))
            .collect()
    }

    fn record(&self, id: EntityId, binding: EntityBinding, device_id: DeviceId) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (binding, device_id));
    }

    fn number_values(&self) -> HashMap<String, f64> {
        self.number_values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember_number(&self, unique_id: String, value: f64) {
        self.number_values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(unique_id, value);
    }

    fn render(
        &self,
        binding: &EntityBinding,
        snapshot: &Snapshot,
        device_id: DeviceId,
    ) -> Result<Entity, BridgeError> {
        let number_values = self.number_values();
        let ctx = RenderContext {
            now: now(),
            number_values: &number_values,
        };
        render(binding, snapshot, device_id, &ctx)
    }
}

/// Register every device and entity the snapshot yields.
async fn publish<C: IntegrationContext>(
    ctx: &C,
    snapshot: &Snapshot,
    published: &Published,
) -> Result<usize, BridgeError> {
    let mut by_device: BTreeMap<String, Vec<EntityBinding>> = BTreeMap::new();
    for binding in bindings_for(snapshot) {
        by_device
            .entry(binding.scope.device_unique_id().to_string())
            .or_default()
            .push(binding);
    }

    let mut count = 0;
    for bindings in by_device.into_values() {
        let Some(first) = bindings.first() else {
            continue;
        };
        let device = first.scope.device(snapshot)?;
        let entities = bindings
            .iter()
            .map(|binding| published.render(binding, snapshot, device.id))
            .collect::<Result<Vec<_>, _>>()?;
        let stored = ctx
            .persist_discovered(DiscoveredDevice { device, entities })
            .await?;
        for (binding, entity) in bindings.into_iter().zip(stored) {
            published.record(entity.id, binding, entity.device_id);
            count += 1;
        }
    }
    debug!(entities = count, "Published snapshot");
    Ok(count)
}

/// Flag every registered entity unavailable, keeping its last attributes.
async fn mark_unavailable<C: IntegrationContext>(
    ctx: &C,
    last_good: Option<&Snapshot>,
    published: &Published,
) {
    let Some(snapshot) = last_good else {
        return;
    };
    for (id, binding, device_id) in published.bindings() {
        let mut entity = match published.render(&binding, snapshot, device_id) {
            Ok(entity) => entity,
            Err(err) => {
                warn!(unique_id = %binding.unique_id(), error = %err, "Failed to render entity");
                continue;
            }
        };
        entity.id = id;
        entity.update_state(EntityState::Unavailable, now());
        if let Err(err) = ctx.upsert_entity(entity).await {
            warn!(unique_id = %binding.unique_id(), error = %err, "Failed to mark entity unavailable");
        }
    }
}

/// Bridges one Evnex account into the host.
pub struct EvnexIntegration<A, T> {
    api: Arc<A>,
    tokens: Arc<T>,
    settings: EvnexSettings,
    coordinator: Arc<Coordinator<A, T>>,
    published: Arc<Published>,
    tasks: Vec<JoinHandle<()>>,
}

impl<A, T> EvnexIntegration<A, T>
where
    A: EvnexApi + 'static,
    T: TokenStore + 'static,
{
    pub fn new(api: Arc<A>, tokens: Arc<T>, settings: EvnexSettings) -> Self {
        let refresh = RefreshService::new(
            Arc::clone(&api),
            Arc::clone(&tokens),
            RefreshSettings {
                entry_id: settings.entry_id.clone(),
                insight_days: settings.insight_days,
            },
        );
        let coordinator = Arc::new(Coordinator::new(refresh, settings.poll_interval));
        Self {
            api,
            tokens,
            settings,
            coordinator,
            published: Arc::default(),
            tasks: Vec::new(),
        }
    }

    /// The polling coordinator, for observing refresh outcomes.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator<A, T>> {
        &self.coordinator
    }
}

impl<A, T> Integration for EvnexIntegration<A, T>
where
    A: EvnexApi + 'static,
    T: TokenStore + 'static,
{
    fn name(&self) -> &'static str {
        INTEGRATION
    }

    async fn setup(&mut self, ctx: &impl IntegrationContext) -> Result<(), BridgeError> {
        if let Some(tokens) = self.tokens.load(&self.settings.entry_id) {
            debug!(entry = %self.settings.entry_id, "Restoring persisted session tokens");
            self.api.set_tokens(tokens);
        }

        let report = migrate_entities(ctx, INTEGRATION).await?;
        if !report.renamed.is_empty() {
            info!(renamed = report.renamed.len(), "Migrated legacy unique ids");
        }

        let snapshot = self
            .coordinator
            .first_refresh()
            .await
            .map_err(RefreshError::into_domain)?;
        let count = publish(ctx, &snapshot, &self.published).await?;
        info!(entities = count, "Evnex integration set up");
        Ok(())
    }

    async fn start_background(
        &mut self,
        ctx: impl IntegrationContext + Clone + 'static,
    ) -> Result<(), BridgeError> {
        self.tasks
            .push(tokio::spawn(Arc::clone(&self.coordinator).run()));

        let mut changes = WatchStream::from_changes(self.coordinator.subscribe());
        let published = Arc::clone(&self.published);
        self.tasks.push(tokio::spawn(async move {
            while let Some(state) = changes.next().await {
                match state {
                    DataState::Ready(snapshot) => {
                        if let Err(err) = publish(&ctx, &snapshot, &published).await {
                            warn!(error = %err, "Failed to publish snapshot");
                        }
                    }
                    DataState::Failed { error, last_good } => {
                        warn!(%error, "Marking entities unavailable");
                        mark_unavailable(&ctx, last_good.as_deref(), &published).await;
                    }
                    DataState::Pending => {}
                }
            }
        }));
        info!(interval = ?self.settings.poll_interval, "Background polling started");
        Ok(())
    }

    async fn handle_service_call(
        &self,
        entity_id: EntityId,
        service: &str,
        data: serde_json::Value,
    ) -> Result<Entity, BridgeError> {
        let (binding, device_id) =
            self.published
                .binding(entity_id)
                .ok_or_else(|| NotFoundError {
                    entity: "Entity",
                    id: entity_id.to_string(),
                })?;
        let snapshot = self.coordinator.snapshot().ok_or_else(|| NotFoundError {
            entity: "Snapshot",
            id: self.settings.entry_id.clone(),
        })?;

        let command = command_for(&binding, service, &data, &snapshot)?;
        execute(&*self.api, &command)
            .await
            .map_err(ApiError::into_domain)?;

        let assumed = match &command {
            Command::SetChargeNow { charge_now, .. } => Some(*charge_now),
            Command::SetConnectorAvailability { enabled, .. } => Some(*enabled),
            Command::SetMaxCurrent { amps, .. } => {
                self.published.remember_number(binding.unique_id(), *amps);
                None
            }
            Command::StopSession { .. } => None,
        };
        self.coordinator.request_refresh();

        let mut entity = self.published.render(&binding, &snapshot, device_id)?;
        entity.id = entity_id;
        if let Some(on) = assumed {
            entity.update_state(EntityState::from_flag(Some(on)), now());
        }
        Ok(entity)
    }

    async fn teardown(&mut self) -> Result<(), BridgeError> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Evnex integration stopped");
        Ok(())
    }
}
