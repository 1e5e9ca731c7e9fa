//! Entity: one observable or controllable aspect of a device.
//!
//! An entity is identified in two ways:
//! - [`EntityId`]: the host registry's opaque UUID;
//! - `unique_id`: the integration-owned stable key, `<org-or-charger-id><suffix>`.
//!
//! The registry upserts by `(integration, unique_id)`, so re-rendering an
//! entity on every refresh keeps its [`EntityId`].

mod attribute_value;
mod state;

pub use attribute_value::AttributeValue;
pub use state::EntityState;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ValidationError};
use crate::id::{DeviceId, EntityId};
use crate::time::{Timestamp, now};

/// Entity domain, which decides the services an entity accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Sensor,
    Switch,
    Number,
    Button,
}

impl EntityKind {
    /// Lowercase domain name used as the `entity_id` prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Switch => "switch",
            Self::Number => "number",
            Self::Button => "button",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sensor" => Ok(Self::Sensor),
            "switch" => Ok(Self::Switch),
            "number" => Ok(Self::Number),
            "button" => Ok(Self::Button),
            other => Err(ValidationError::InvalidEntityId(other.to_string())),
        }
    }
}

/// A single entity as registered with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub device_id: DeviceId,
    pub kind: EntityKind,
    /// Human-facing id, `<kind>.<slug>`.
    pub entity_id: String,
    /// Integration-owned stable key.
    pub unique_id: String,
    /// Name of the integration that owns this entity.
    pub integration: String,
    pub friendly_name: String,
    pub state: EntityState,
    pub attributes: HashMap<String, AttributeValue>,
    pub last_changed: Timestamp,
    pub last_updated: Timestamp,
}

impl Entity {
    /// Create a builder for constructing an [`Entity`].
    #[must_use]
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// Look up an attribute by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Replace the state, bumping `last_changed` only when it differs.
    pub fn update_state(&mut self, state: EntityState, at: Timestamp) {
        if self.state != state {
            self.state = state;
            self.last_changed = at;
        }
        self.last_updated = at;
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] when the name or unique id is
    /// empty, or when `entity_id` does not start with `<kind>.`.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.friendly_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.unique_id.is_empty() {
            return Err(ValidationError::EmptyUniqueId.into());
        }
        let valid_prefix = self
            .entity_id
            .split_once('.')
            .is_some_and(|(prefix, slug)| prefix == self.kind.as_str() && !slug.is_empty());
        if !valid_prefix {
            return Err(ValidationError::InvalidEntityId(self.entity_id.clone()).into());
        }
        Ok(())
    }
}

/// Derive the `<kind>.<slug>` entity id from a unique id.
#[must_use]
pub fn entity_id_for(kind: EntityKind, unique_id: &str) -> String {
    let slug: String = unique_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{kind}.evnex_{slug}")
}

/// Step-by-step builder for [`Entity`].
#[derive(Debug, Default)]
pub struct EntityBuilder {
    id: Option<EntityId>,
    device_id: Option<DeviceId>,
    kind: Option<EntityKind>,
    entity_id: Option<String>,
    unique_id: Option<String>,
    integration: Option<String>,
    friendly_name: Option<String>,
    state: EntityState,
    attributes: HashMap<String, AttributeValue>,
}

impl EntityBuilder {
    #[must_use]
    pub fn id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Override the derived `<kind>.<slug>` entity id.
    #[must_use]
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    #[must_use]
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    #[must_use]
    pub fn integration(mut self, integration: impl Into<String>) -> Self {
        self.integration = Some(integration.into());
        self
    }

    #[must_use]
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn state(mut self, state: EntityState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set an attribute only when a value is present.
    #[must_use]
    pub fn maybe_attribute(
        self,
        name: impl Into<String>,
        value: Option<impl Into<AttributeValue>>,
    ) -> Self {
        match value {
            Some(value) => self.attribute(name, value),
            None => self,
        }
    }

    /// Consume the builder, validate, and return an [`Entity`].
    ///
    /// Defaults: a fresh [`EntityId`], a fresh [`DeviceId`], kind `sensor`,
    /// and an `entity_id` derived from the unique id.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] if an invariant fails.
    pub fn build(self) -> Result<Entity, BridgeError> {
        let kind = self.kind.unwrap_or(EntityKind::Sensor);
        let unique_id = self.unique_id.unwrap_or_default();
        let entity_id = self
            .entity_id
            .unwrap_or_else(|| entity_id_for(kind, &unique_id));
        let ts = now();
        let entity = Entity {
            id: self.id.unwrap_or_default(),
            device_id: self.device_id.unwrap_or_default(),
            kind,
            entity_id,
            unique_id,
            integration: self.integration.unwrap_or_default(),
            friendly_name: self.friendly_name.unwrap_or_default(),
            state: self.state,
            attributes: self.attributes,
            last_changed: ts,
            last_updated: ts,
        };
        entity.validate()?;
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntityBuilder {
        Entity::builder()
            .kind(EntityKind::Switch)
            .unique_id("4f2c-charge_now")
            .integration("evnex")
            .friendly_name("Charge Now")
    }

    #[test]
    fn should_derive_entity_id_from_unique_id() {
        let entity = sample().build().unwrap();
        assert_eq!(entity.entity_id, "switch.evnex_4f2c_charge_now");
        assert_eq!(entity.state, EntityState::Unknown);
    }

    #[test]
    fn should_reject_empty_name() {
        let result = Entity::builder().unique_id("abc").build();
        assert!(matches!(
            result,
            Err(BridgeError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_empty_unique_id() {
        let result = Entity::builder().friendly_name("x").build();
        assert!(matches!(
            result,
            Err(BridgeError::Validation(ValidationError::EmptyUniqueId))
        ));
    }

    #[test]
    fn should_reject_entity_id_with_wrong_prefix() {
        let result = sample().entity_id("sensor.charge_now").build();
        assert!(matches!(
            result,
            Err(BridgeError::Validation(ValidationError::InvalidEntityId(_)))
        ));
    }

    #[test]
    fn should_skip_absent_optional_attribute() {
        let entity = sample()
            .maybe_attribute("unit", None::<&str>)
            .maybe_attribute("icon", Some("mdi:ev-station"))
            .build()
            .unwrap();
        assert!(entity.get_attribute("unit").is_none());
        assert_eq!(
            entity.get_attribute("icon"),
            Some(&AttributeValue::String("mdi:ev-station".to_string()))
        );
    }

    #[test]
    fn should_only_bump_last_changed_when_state_differs() {
        let mut entity = sample().state(EntityState::Off).build().unwrap();
        let changed = entity.last_changed;
        let later = changed + chrono::Duration::seconds(30);

        entity.update_state(EntityState::Off, later);
        assert_eq!(entity.last_changed, changed);
        assert_eq!(entity.last_updated, later);

        entity.update_state(EntityState::On, later);
        assert_eq!(entity.last_changed, later);
    }

    #[test]
    fn should_parse_kind_from_str() {
        assert_eq!("number".parse::<EntityKind>().unwrap(), EntityKind::Number);
        assert!("light".parse::<EntityKind>().is_err());
    }
}
