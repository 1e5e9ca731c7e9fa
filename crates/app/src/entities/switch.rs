//! Switch table: on/off entities backed by a vendor command.

use evnex_bridge_domain::entity::{EntityKind, EntityState};
use evnex_bridge_domain::snapshot::{OcppStatus, Snapshot};

use super::{Command, Level, Observation, ObservesSnapshot, RenderContext, Scope};

pub struct SwitchDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub level: Level,
    pub state: fn(&Snapshot, &Scope) -> Observation,
    /// Command turning the switch on (`true`) or off (`false`).
    pub command: fn(&Scope, bool) -> Option<Command>,
}

impl ObservesSnapshot for SwitchDescription {
    fn kind(&self) -> EntityKind {
        EntityKind::Switch
    }

    fn key(&self) -> &'static str {
        self.key
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn level(&self) -> Level {
        self.level
    }

    fn observe(&self, snapshot: &Snapshot, scope: &Scope, _ctx: &RenderContext<'_>) -> Observation {
        (self.state)(snapshot, scope)
    }
}

pub static SWITCHES: &[SwitchDescription] = &[
    SwitchDescription {
        key: "charger_charge_now_switch",
        name: "Charge Now",
        level: Level::Charger,
        state: |snapshot, scope| {
            let Some(charger_id) = scope
                .charger_id()
                .filter(|id| snapshot.charge_points.contains_key(*id))
            else {
                return Observation::unavailable();
            };
            match snapshot.override_of(charger_id) {
                Some(charge_override) if charge_override.charge_now => {
                    Observation::state(EntityState::On).with("icon", "mdi:check-network")
                }
                Some(_) => Observation::state(EntityState::Off).with("icon", "mdi:close-network"),
                None => Observation::state(EntityState::Unknown),
            }
        },
        command: |scope, on| {
            Some(Command::SetChargeNow {
                charger_id: scope.charger_id()?.to_string(),
                charge_now: on,
            })
        },
    },
    SwitchDescription {
        key: "availability",
        name: "Availability",
        level: Level::Connector,
        state: |snapshot, scope| {
            let connector = scope
                .charger_id()
                .zip(scope.connector_id())
                .and_then(|(charger, connector)| snapshot.connector(charger, connector));
            match connector {
                Some(c) if c.ocpp_status == OcppStatus::Unavailable => {
                    Observation::state(EntityState::Off).with("icon", "mdi:ev-plug-type2")
                }
                Some(_) => Observation::state(EntityState::On).with("icon", "mdi:ev-plug-type2"),
                None => Observation::unavailable(),
            }
        },
        command: |scope, on| {
            Some(Command::SetConnectorAvailability {
                org_id: scope.org_id().to_string(),
                charger_id: scope.charger_id()?.to_string(),
                connector_id: scope.connector_id()?.to_string(),
                enabled: on,
            })
        },
    },
];

pub fn find(key: &str) -> Option<&'static SwitchDescription> {
    SWITCHES.iter().find(|d| d.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CP_OFFLINE, CP_ONLINE, ORG, sample_snapshot};

    fn state(key: &str, scope: &Scope) -> EntityState {
        let description = find(key).unwrap();
        (description.state)(&sample_snapshot(), scope).state
    }

    #[test]
    fn should_follow_override_when_known() {
        let scope = Scope::Charger {
            org_id: ORG.to_string(),
            charger_id: CP_ONLINE.to_string(),
        };
        assert_eq!(state("charger_charge_now_switch", &scope), EntityState::On);
    }

    #[test]
    fn should_be_unknown_when_override_is_absent() {
        let scope = Scope::Charger {
            org_id: ORG.to_string(),
            charger_id: CP_OFFLINE.to_string(),
        };
        assert_eq!(
            state("charger_charge_now_switch", &scope),
            EntityState::Unknown
        );
    }

    #[test]
    fn should_turn_off_availability_for_unavailable_connector() {
        let scope = Scope::Connector {
            org_id: ORG.to_string(),
            charger_id: CP_OFFLINE.to_string(),
            connector_id: "1".to_string(),
        };
        assert_eq!(state("availability", &scope), EntityState::Off);
    }

    #[test]
    fn should_build_connector_command_with_org() {
        let scope = Scope::Connector {
            org_id: ORG.to_string(),
            charger_id: CP_ONLINE.to_string(),
            connector_id: "1".to_string(),
        };
        let command = (find("availability").unwrap().command)(&scope, true);
        assert_eq!(
            command,
            Some(Command::SetConnectorAvailability {
                org_id: ORG.to_string(),
                charger_id: CP_ONLINE.to_string(),
                connector_id: "1".to_string(),
                enabled: true,
            })
        );
    }
}
