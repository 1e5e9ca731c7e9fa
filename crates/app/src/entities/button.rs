//! Button table: one-shot actions.

use evnex_bridge_domain::entity::{EntityKind, EntityState};
use evnex_bridge_domain::snapshot::Snapshot;

use super::{Command, Level, Observation, ObservesSnapshot, RenderContext, Scope};

/// Connector whose status decides whether a session can be stopped.
const SESSION_CONNECTOR: &str = "1";

pub struct ButtonDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub available: fn(&Snapshot, &Scope) -> bool,
    pub command: fn(&Scope) -> Option<Command>,
}

impl ObservesSnapshot for ButtonDescription {
    fn kind(&self) -> EntityKind {
        EntityKind::Button
    }

    fn key(&self) -> &'static str {
        self.key
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn level(&self) -> Level {
        Level::Charger
    }

    fn observe(&self, snapshot: &Snapshot, scope: &Scope, _ctx: &RenderContext<'_>) -> Observation {
        if (self.available)(snapshot, scope) {
            Observation::state(EntityState::Unknown).with("icon", self.icon)
        } else {
            Observation::unavailable()
        }
    }
}

pub static BUTTONS: &[ButtonDescription] = &[ButtonDescription {
    key: "charger_stop_session",
    name: "Stop Session",
    icon: "mdi:stop-circle-outline",
    available: |snapshot, scope| {
        scope
            .charger_id()
            .and_then(|id| snapshot.connector(id, SESSION_CONNECTOR))
            .is_some_and(|c| c.ocpp_status.is_session_ready())
    },
    command: |scope| {
        Some(Command::StopSession {
            charger_id: scope.charger_id()?.to_string(),
            org_id: scope.org_id().to_string(),
        })
    },
}];

pub fn find(key: &str) -> Option<&'static ButtonDescription> {
    BUTTONS.iter().find(|d| d.key == key)
}
