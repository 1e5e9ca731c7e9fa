//! Sensor table: read-only readings over the snapshot.

use evnex_bridge_domain::entity::{AttributeValue, EntityKind};
use evnex_bridge_domain::snapshot::{
    ChargePoint, Connector, ConnectorMeter, OrgInsight, Session, Snapshot,
};
use evnex_bridge_domain::time::{Timestamp, seconds_between};

use super::{Level, Observation, ObservesSnapshot, RenderContext, Scope};

/// Sessions listed in the history sensor's `sessions` attribute.
const MAX_SESSIONS_IN_ATTRIBUTES: usize = 10;

pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub level: Level,
    pub icon: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub value: fn(&Snapshot, &Scope, Timestamp) -> Observation,
}

impl ObservesSnapshot for SensorDescription {
    fn kind(&self) -> EntityKind {
        EntityKind::Sensor
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

    fn observe(&self, snapshot: &Snapshot, scope: &Scope, ctx: &RenderContext<'_>) -> Observation {
        let observation = (self.value)(snapshot, scope, ctx.now);
        if !observation.state.is_available() {
            return observation;
        }
        observation
            .or_with("icon", Some(self.icon))
            .or_with("unit", self.unit)
            .or_with("device_class", self.device_class)
            .or_with("state_class", self.state_class)
    }
}

pub static SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "org_wide_power_usage_today",
        name: "Total Power Usage Today",
        level: Level::Org,
        icon: "mdi:lightning-bolt-circle",
        unit: Some("Wh"),
        device_class: Some("energy"),
        state_class: Some("total"),
        value: |snapshot, scope, _| {
            org_insight(snapshot, scope, |insight| {
                (AttributeValue::Float(insight.power_usage), insight.start_date)
            })
        },
    },
    SensorDescription {
        key: "org_wide_charger_sessions_today",
        name: "Charger Sessions Today",
        level: Level::Org,
        icon: "mdi:repeat-once",
        unit: Some("sessions"),
        device_class: None,
        state_class: Some("total"),
        value: |snapshot, scope, _| {
            org_insight(snapshot, scope, |insight| {
                (AttributeValue::Int(insight.sessions), insight.start_date)
            })
        },
    },
    SensorDescription {
        key: "org_tier",
        name: "Organisation Tier",
        level: Level::Org,
        icon: "mdi:warehouse",
        unit: None,
        device_class: None,
        state_class: None,
        value: |snapshot, scope, _| match snapshot.org_briefs.get(scope.org_id()) {
            Some(org) => Observation::reading(org.tier.clone().map(AttributeValue::from)),
            None => Observation::unavailable(),
        },
    },
    SensorDescription {
        key: "charger_network_status",
        name: "Network Status",
        level: Level::Charger,
        icon: "mdi:wifi",
        unit: None,
        device_class: None,
        state_class: None,
        value: |snapshot, scope, _| match charger(snapshot, scope) {
            Some(cp) => Observation::reading(Some(cp.network_status.as_str().into())),
            None => Observation::unavailable(),
        },
    },
    SensorDescription {
        key: "session_energy",
        name: "Session Energy Added",
        level: Level::Charger,
        icon: "mdi:lightning-bolt-circle",
        unit: Some("Wh"),
        device_class: Some("energy"),
        state_class: Some("total_increasing"),
        value: |snapshot, scope, _| {
            latest_session(snapshot, scope, |session| {
                let energy = session
                    .filter(|s| s.is_active())
                    .and_then(|s| s.total_power_usage)
                    .unwrap_or(0.0);
                Observation::reading(Some(energy.into()))
            })
        },
    },
    SensorDescription {
        key: "session_cost",
        name: "Charge Cost",
        level: Level::Charger,
        icon: "mdi:cash-multiple",
        unit: None,
        device_class: Some("monetary"),
        state_class: Some("total"),
        value: |snapshot, scope, _| {
            latest_session(snapshot, scope, |session| {
                let cost = session
                    .filter(|s| s.is_active())
                    .and_then(|s| s.total_cost.as_ref());
                let amount = cost.and_then(|c| c.amount).unwrap_or(0.0);
                Observation::reading(Some(amount.into()))
                    .or_with("currency", cost.and_then(|c| c.currency.clone()))
            })
        },
    },
    SensorDescription {
        key: "session_time",
        name: "Charge Time",
        level: Level::Charger,
        icon: "mdi:timer",
        unit: Some("s"),
        device_class: Some("duration"),
        state_class: None,
        value: |snapshot, scope, now| {
            latest_session(snapshot, scope, |session| {
                Observation::reading(
                    session
                        .and_then(|s| session_duration(s, now))
                        .map(AttributeValue::Float),
                )
            })
        },
    },
    SensorDescription {
        key: "session_start_time",
        name: "Last Session Start",
        level: Level::Charger,
        icon: "mdi:progress-clock",
        unit: None,
        device_class: Some("timestamp"),
        state_class: None,
        value: |snapshot, scope, _| {
            latest_session(snapshot, scope, |session| {
                Observation::reading(session.and_then(|s| s.start_date).map(AttributeValue::from))
            })
        },
    },
    SensorDescription {
        key: "charger_session_history",
        name: "Session History",
        level: Level::Charger,
        icon: "mdi:history",
        unit: None,
        device_class: None,
        state_class: None,
        value: |snapshot, scope, now| match scope
            .charger_id()
            .and_then(|id| snapshot.charge_point_sessions.get(id))
        {
            Some(sessions) => {
                let recent: Vec<serde_json::Value> = sessions
                    .iter()
                    .take(MAX_SESSIONS_IN_ATTRIBUTES)
                    .map(|s| session_entry(s, now))
                    .collect();
                let count = i64::try_from(recent.len()).unwrap_or(i64::MAX);
                Observation::reading(Some(count.into())).with(
                    "sessions",
                    AttributeValue::Json(serde_json::Value::Array(recent)),
                )
            }
            None => Observation::unavailable(),
        },
    },
    SensorDescription {
        key: "status",
        name: "Status",
        level: Level::Connector,
        icon: "mdi:help-circle",
        unit: None,
        device_class: None,
        state_class: None,
        value: |snapshot, scope, _| match connector(snapshot, scope) {
            Some(c) => Observation::reading(Some(c.ocpp_status.as_str().into()))
                .with("icon", c.ocpp_status.icon()),
            None => Observation::unavailable(),
        },
    },
    SensorDescription {
        key: "voltage",
        name: "Voltage L1N",
        level: Level::Connector,
        icon: "mdi:lightning-bolt",
        unit: Some("V"),
        device_class: Some("voltage"),
        state_class: Some("measurement"),
        value: |snapshot, scope, _| meter(snapshot, scope, |m| m.voltage_l1n),
    },
    SensorDescription {
        key: "current",
        name: "Current L1",
        level: Level::Connector,
        icon: "mdi:lightning-bolt",
        unit: Some("A"),
        device_class: Some("current"),
        state_class: Some("measurement"),
        value: |snapshot, scope, _| meter(snapshot, scope, |m| m.current_l1),
    },
    SensorDescription {
        key: "power",
        name: "Metered Power",
        level: Level::Connector,
        icon: "mdi:flash-triangle",
        unit: Some("kW"),
        device_class: Some("power"),
        state_class: Some("measurement"),
        value: |snapshot, scope, _| meter(snapshot, scope, |m| m.power.map(|w| w / 1000.0)),
    },
    SensorDescription {
        key: "frequency",
        name: "Metered Frequency",
        level: Level::Connector,
        icon: "mdi:sine-wave",
        unit: Some("Hz"),
        device_class: Some("frequency"),
        state_class: Some("measurement"),
        value: |snapshot, scope, _| meter(snapshot, scope, |m| m.frequency),
    },
];

fn charger<'a>(snapshot: &'a Snapshot, scope: &Scope) -> Option<&'a ChargePoint> {
    scope
        .charger_id()
        .and_then(|id| snapshot.charge_points.get(id))
}

fn connector<'a>(snapshot: &'a Snapshot, scope: &Scope) -> Option<&'a Connector> {
    let charger_id = scope.charger_id()?;
    let connector_id = scope.connector_id()?;
    snapshot.connector(charger_id, connector_id)
}

fn org_insight(
    snapshot: &Snapshot,
    scope: &Scope,
    read: fn(&OrgInsight) -> (AttributeValue, Timestamp),
) -> Observation {
    if !snapshot.org_briefs.contains_key(scope.org_id()) {
        return Observation::unavailable();
    }
    match snapshot.latest_insight(scope.org_id()) {
        Some(insight) => {
            let (value, last_reset) = read(insight);
            Observation::reading(Some(value)).with("last_reset", last_reset)
        }
        None => Observation::reading(None),
    }
}

fn latest_session(
    snapshot: &Snapshot,
    scope: &Scope,
    read: impl FnOnce(Option<&Session>) -> Observation,
) -> Observation {
    match charger(snapshot, scope) {
        Some(cp) => read(snapshot.latest_session(&cp.id)),
        None => Observation::unavailable(),
    }
}

fn meter(
    snapshot: &Snapshot,
    scope: &Scope,
    read: fn(&ConnectorMeter) -> Option<f64>,
) -> Observation {
    match connector(snapshot, scope) {
        Some(c) => Observation::reading(c.meter.as_ref().and_then(read).map(AttributeValue::Float)),
        None => Observation::unavailable(),
    }
}

/// Running time of an active session, or total time of a finished one.
fn session_duration(session: &Session, now: Timestamp) -> Option<f64> {
    let start = session.start_date?;
    Some(seconds_between(start, session.end_date.unwrap_or(now)))
}

fn session_entry(session: &Session, now: Timestamp) -> serde_json::Value {
    let cost = session.total_cost.as_ref();
    serde_json::json!({
        "session_id": session.id,
        "start_time": session.start_date.map(|t| t.to_rfc3339()),
        "end_time": session.end_date.map(|t| t.to_rfc3339()),
        "status": session.session_status,
        "connector_id": session.connector_id,
        "energy_wh": session.total_power_usage,
        "duration_seconds": session_duration(session, now),
        "cost": cost.and_then(|c| c.amount),
        "currency": cost.and_then(|c| c.currency.clone()),
    })
}
