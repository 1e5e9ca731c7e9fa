//! Number table: settable limits.

use evnex_bridge_domain::entity::{EntityKind, EntityState};
use evnex_bridge_domain::error::ValidationError;
use evnex_bridge_domain::snapshot::{NetworkStatus, Snapshot};

use super::{Command, EntityBinding, Level, Observation, ObservesSnapshot, RenderContext, Scope};

pub struct NumberDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub step: f64,
    /// Upper bound; the entity exists only when it is known.
    pub max: fn(&Snapshot, &Scope) -> Option<f64>,
    pub command: fn(&Scope, f64) -> Option<Command>,
}

impl NumberDescription {
    /// Reject values outside `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidServiceData`] for an out-of-range value.
    pub fn check(&self, snapshot: &Snapshot, scope: &Scope, value: f64) -> Result<(), ValidationError> {
        let max = (self.max)(snapshot, scope).unwrap_or(f64::INFINITY);
        if !value.is_finite() || value < self.min || value > max {
            return Err(ValidationError::InvalidServiceData("value out of range"));
        }
        Ok(())
    }
}

impl ObservesSnapshot for NumberDescription {
    fn kind(&self) -> EntityKind {
        EntityKind::Number
    }

    fn key(&self) -> &'static str {
        self.key
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn level(&self) -> Level {
        Level::Connector
    }

    fn applies_to(&self, snapshot: &Snapshot, scope: &Scope) -> bool {
        (self.max)(snapshot, scope).is_some()
    }

    fn observe(&self, snapshot: &Snapshot, scope: &Scope, ctx: &RenderContext<'_>) -> Observation {
        let Some(max) = (self.max)(snapshot, scope) else {
            return Observation::unavailable();
        };
        let offline = scope
            .charger_id()
            .and_then(|id| snapshot.charge_points.get(id))
            .is_none_or(|cp| cp.network_status == NetworkStatus::Offline);
        if offline {
            return Observation::unavailable();
        }
        let unique_id = EntityBinding {
            kind: EntityKind::Number,
            key: self.key,
            scope: scope.clone(),
        }
        .unique_id();
        let value = ctx.number_values.get(&unique_id).copied().unwrap_or(max);
        Observation::state(EntityState::On)
            .with("value", value)
            .with("min", self.min)
            .with("max", max)
            .with("step", self.step)
            .with("unit", self.unit)
            .with("icon", self.icon)
    }
}

pub static NUMBERS: &[NumberDescription] = &[NumberDescription {
    key: "maximum_current",
    name: "Maximum Current",
    icon: "mdi:speedometer",
    unit: "A",
    min: 0.0,
    step: 1.0,
    max: |snapshot, scope| {
        let connector = snapshot.connector(scope.charger_id()?, scope.connector_id()?)?;
        connector.max_amperage
    },
    command: |scope, amps| {
        Some(Command::SetMaxCurrent {
            charger_id: scope.charger_id()?.to_string(),
            amps,
        })
    },
}];

pub fn find(key: &str) -> Option<&'static NumberDescription> {
    NUMBERS.iter().find(|d| d.key == key)
}
