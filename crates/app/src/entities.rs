//! Entity descriptions: data-driven tables mapping a key to pure functions.
//!
//! Every exposed entity is an [`EntityBinding`]: a description row (sensor,
//! switch, number or button) applied to a [`Scope`] (an organisation, a
//! charger, or one connector of a charger). Rendering a binding against a
//! [`Snapshot`] is a pure function; mutating entities turn a service call
//! into a [`Command`] which [`execute`] runs against the vendor API.

mod button;
mod command;
mod device;
mod number;
mod sensor;
mod switch;

pub use command::{Command, execute};
pub use device::DeviceIdentity;

use std::collections::HashMap;

use evnex_bridge_domain::entity::{AttributeValue, Entity, EntityKind, EntityState};
use evnex_bridge_domain::error::{BridgeError, NotFoundError, ValidationError};
use evnex_bridge_domain::id::DeviceId;
use evnex_bridge_domain::snapshot::{ChargerId, ConnectorId, OrgId, Snapshot};
use evnex_bridge_domain::time::Timestamp;

/// Name under which devices and entities are registered.
pub const INTEGRATION: &str = "evnex";

/// What a description row is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Org {
        org_id: OrgId,
    },
    Charger {
        org_id: OrgId,
        charger_id: ChargerId,
    },
    Connector {
        org_id: OrgId,
        charger_id: ChargerId,
        connector_id: ConnectorId,
    },
}

/// Scope granularity a description row applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Org,
    Charger,
    Connector,
}

impl Scope {
    #[must_use]
    pub fn org_id(&self) -> &str {
        match self {
            Self::Org { org_id } | Self::Charger { org_id, .. } | Self::Connector { org_id, .. } => {
                org_id
            }
        }
    }

    #[must_use]
    pub fn charger_id(&self) -> Option<&str> {
        match self {
            Self::Org { .. } => None,
            Self::Charger { charger_id, .. } | Self::Connector { charger_id, .. } => {
                Some(charger_id)
            }
        }
    }

    #[must_use]
    pub fn connector_id(&self) -> Option<&str> {
        match self {
            Self::Connector { connector_id, .. } => Some(connector_id),
            _ => None,
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::Org { .. } => Level::Org,
            Self::Charger { .. } => Level::Charger,
            Self::Connector { .. } => Level::Connector,
        }
    }

    /// Entity key for a description key; connector keys embed the connector id.
    #[must_use]
    pub fn key(&self, key: &str) -> String {
        match self {
            Self::Connector { connector_id, .. } => format!("connector_{connector_id}_{key}"),
            _ => key.to_string(),
        }
    }

    /// Display name of an entity in this scope.
    #[must_use]
    pub fn friendly_name(&self, snapshot: &Snapshot, name: &str) -> String {
        let owner = match self {
            Self::Org { org_id } => snapshot.org_briefs.get(org_id).map(|org| org.name.as_str()),
            Self::Charger { charger_id, .. } | Self::Connector { charger_id, .. } => snapshot
                .charge_points
                .get(charger_id)
                .map(|cp| cp.name.as_str()),
        };
        let owner = owner.unwrap_or("Evnex");
        match self {
            Self::Connector { connector_id, .. } => {
                format!("{owner} Connector {connector_id} {name}")
            }
            _ => format!("{owner} {name}"),
        }
    }
}

/// Inputs to rendering that are not part of the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub now: Timestamp,
    /// Last value written to each number entity, by unique id.
    pub number_values: &'a HashMap<String, f64>,
}

/// State and attributes computed for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub state: EntityState,
    pub attributes: Vec<(&'static str, AttributeValue)>,
}

impl Observation {
    /// A reading held in the `value` attribute; `None` leaves the state unknown.
    #[must_use]
    pub fn reading(value: Option<AttributeValue>) -> Self {
        match value {
            Some(value) => Self {
                state: EntityState::On,
                attributes: vec![("value", value)],
            },
            None => Self::state(EntityState::Unknown),
        }
    }

    #[must_use]
    pub fn state(state: EntityState) -> Self {
        Self {
            state,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self::state(EntityState::Unavailable)
    }

    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    /// Add an attribute unless one with the same name is already set.
    #[must_use]
    pub fn or_with(self, name: &'static str, value: Option<impl Into<AttributeValue>>) -> Self {
        match value {
            Some(value) if !self.has(name) => self.with(name, value),
            _ => self,
        }
    }

    fn has(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| *n == name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

/// Capability shared by every description row.
pub trait ObservesSnapshot: Sync {
    fn kind(&self) -> EntityKind;
    fn key(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn level(&self) -> Level;
    /// Whether the row yields an entity for this scope at all.
    fn applies_to(&self, _snapshot: &Snapshot, _scope: &Scope) -> bool {
        true
    }
    fn observe(&self, snapshot: &Snapshot, scope: &Scope, ctx: &RenderContext<'_>) -> Observation;
}

fn erase<D: ObservesSnapshot>(description: &'static D) -> &'static dyn ObservesSnapshot {
    description
}

fn descriptions() -> impl Iterator<Item = &'static dyn ObservesSnapshot> {
    sensor::SENSORS
        .iter()
        .map(erase)
        .chain(switch::SWITCHES.iter().map(erase))
        .chain(number::NUMBERS.iter().map(erase))
        .chain(button::BUTTONS.iter().map(erase))
}

/// One description row applied to one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityBinding {
    pub kind: EntityKind,
    pub key: &'static str,
    pub scope: Scope,
}

impl EntityBinding {
    /// `<org-or-charger-id><key>`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        let owner = self.scope.device_unique_id();
        format!("{owner}{}", self.scope.key(self.key))
    }

    fn description(&self) -> Option<&'static dyn ObservesSnapshot> {
        descriptions().find(|d| d.kind() == self.kind && d.key() == self.key)
    }
}

/// Every binding the snapshot yields, in table order per scope.
#[must_use]
pub fn bindings_for(snapshot: &Snapshot) -> Vec<EntityBinding> {
    let mut scopes = Vec::new();
    for org_id in snapshot.org_briefs.keys() {
        scopes.push(Scope::Org {
            org_id: org_id.clone(),
        });
    }
    for (charger_id, org_id) in &snapshot.charge_point_to_org {
        scopes.push(Scope::Charger {
            org_id: org_id.clone(),
            charger_id: charger_id.clone(),
        });
        for connector in snapshot.connectors_of(charger_id) {
            scopes.push(Scope::Connector {
                org_id: org_id.clone(),
                charger_id: charger_id.clone(),
                connector_id: connector.connector_id.clone(),
            });
        }
    }

    let mut bindings = Vec::new();
    for scope in scopes {
        for description in descriptions() {
            if description.level() == scope.level() && description.applies_to(snapshot, &scope) {
                bindings.push(EntityBinding {
                    kind: description.kind(),
                    key: description.key(),
                    scope: scope.clone(),
                });
            }
        }
    }
    bindings
}

/// Render a binding into an entity attached to `device_id`.
///
/// # Errors
///
/// Returns [`BridgeError::NotFound`] when no description row matches the
/// binding, or [`BridgeError::Validation`] if the entity is malformed.
pub fn render(
    binding: &EntityBinding,
    snapshot: &Snapshot,
    device_id: DeviceId,
    ctx: &RenderContext<'_>,
) -> Result<Entity, BridgeError> {
    let description = binding.description().ok_or_else(|| NotFoundError {
        entity: "EntityDescription",
        id: format!("{}.{}", binding.kind, binding.key),
    })?;
    let observation = description.observe(snapshot, &binding.scope, ctx);
    let mut builder = Entity::builder()
        .kind(binding.kind)
        .device_id(device_id)
        .unique_id(binding.unique_id())
        .integration(INTEGRATION)
        .friendly_name(binding.scope.friendly_name(snapshot, description.name()))
        .state(observation.state);
    for (name, value) in observation.attributes {
        builder = builder.attribute(name, value);
    }
    builder.build()
}

/// Translate a service call into a vendor command.
///
/// # Errors
///
/// Returns [`BridgeError::Validation`] when the service is not supported by
/// the entity kind or its data is malformed.
pub fn command_for(
    binding: &EntityBinding,
    service: &str,
    data: &serde_json::Value,
    snapshot: &Snapshot,
) -> Result<Command, BridgeError> {
    let unsupported = || ValidationError::UnsupportedService {
        service: service.to_string(),
        kind: binding.kind.as_str(),
    };
    let command = match (binding.kind, service) {
        (EntityKind::Switch, "turn_on" | "turn_off") => switch::find(binding.key)
            .and_then(|d| (d.command)(&binding.scope, service == "turn_on")),
        (EntityKind::Number, "set_value") => {
            let value = data
                .get("value")
                .and_then(serde_json::Value::as_f64)
                .ok_or(ValidationError::InvalidServiceData("value must be a number"))?;
            match number::find(binding.key) {
                Some(description) => {
                    description.check(snapshot, &binding.scope, value)?;
                    (description.command)(&binding.scope, value)
                }
                None => None,
            }
        }
        (EntityKind::Button, "press") => {
            button::find(binding.key).and_then(|d| (d.command)(&binding.scope))
        }
        _ => None,
    };
    command.ok_or_else(|| unsupported().into())
}
