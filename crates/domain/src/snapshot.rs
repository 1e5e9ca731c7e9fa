//! Snapshot: the keyed result of one refresh cycle.
//!
//! A snapshot is assembled once per refresh through [`SnapshotBuilder`] and
//! then shared read-only behind an `Arc`. Records mirror the vendor's JSON
//! (camelCase) so adapters can decode straight into them.
//!
//! Invariants checked by [`Snapshot::validate`]:
//! - every charger maps to exactly one organisation present in `org_briefs`;
//! - an override is present only for chargers whose detail is `ONLINE`;
//! - sessions are ordered newest first.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ValidationError};
use crate::time::Timestamp;

/// Vendor organisation id.
pub type OrgId = String;
/// Vendor charger id.
pub type ChargerId = String;
/// Connector id, unique within one charger (usually `"1"`).
pub type ConnectorId = String;

/// Charger connectivity as reported by the cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkStatus {
    Online,
    Offline,
    Other(String),
}

impl NetworkStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Other(other) => other,
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl From<String> for NetworkStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ONLINE" => Self::Online,
            "OFFLINE" => Self::Offline,
            _ => Self::Other(value),
        }
    }
}

impl From<NetworkStatus> for String {
    fn from(value: NetworkStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OCPP connector status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OcppStatus {
    Available,
    Preparing,
    Charging,
    SuspendedEv,
    SuspendedEvse,
    Finishing,
    Reserved,
    Occupied,
    Unavailable,
    Faulted,
    Other(String),
}

impl OcppStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Preparing => "PREPARING",
            Self::Charging => "CHARGING",
            Self::SuspendedEv => "SUSPENDED_EV",
            Self::SuspendedEvse => "SUSPENDED_EVSE",
            Self::Finishing => "FINISHING",
            Self::Reserved => "RESERVED",
            Self::Occupied => "OCCUPIED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Faulted => "FAULTED",
            Self::Other(other) => other,
        }
    }

    /// Whether a session is running and can be stopped remotely.
    #[must_use]
    pub fn is_session_ready(&self) -> bool {
        matches!(
            self,
            Self::Charging | Self::SuspendedEv | Self::SuspendedEvse
        )
    }

    /// Icon hint matching the status.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Available => "mdi:power-plug-off",
            Self::Preparing => "mdi:power-plug-outline",
            Self::Occupied | Self::SuspendedEv | Self::SuspendedEvse => "mdi:power-plug",
            Self::Charging => "mdi:battery-positive",
            Self::Finishing => "mdi:power-plug-off-outline",
            Self::Reserved => "mdi:timer-sand",
            Self::Unavailable => "mdi:lan-disconnect",
            Self::Faulted => "mdi:alert-circle",
            Self::Other(_) => "mdi:help-circle",
        }
    }
}

impl From<String> for OcppStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AVAILABLE" => Self::Available,
            "PREPARING" => Self::Preparing,
            "CHARGING" => Self::Charging,
            "SUSPENDED_EV" => Self::SuspendedEv,
            "SUSPENDED_EVSE" => Self::SuspendedEvse,
            "FINISHING" => Self::Finishing,
            "RESERVED" => Self::Reserved,
            "OCCUPIED" => Self::Occupied,
            "UNAVAILABLE" => Self::Unavailable,
            "FAULTED" => Self::Faulted,
            _ => Self::Other(value),
        }
    }
}

impl From<OcppStatus> for String {
    fn from(value: OcppStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OcppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organisation membership of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgBrief {
    pub id: OrgId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organisations: Vec<OrgBrief>,
}

/// Hardware description carried by the org listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePointDetails {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub firmware: Option<String>,
}

/// Connector as listed in the org charge point listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorBrief {
    pub connector_id: ConnectorId,
    #[serde(default)]
    pub connector_type: Option<String>,
    #[serde(default)]
    pub evse_id: Option<String>,
}

/// Charger as listed under an organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePoint {
    pub id: ChargerId,
    pub name: String,
    #[serde(default)]
    pub serial: Option<String>,
    pub network_status: NetworkStatus,
    #[serde(default)]
    pub details: ChargePointDetails,
    #[serde(default)]
    pub connectors: Vec<ConnectorBrief>,
}

/// Live electrical readings of a connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorMeter {
    #[serde(default, rename = "voltageL1N")]
    pub voltage_l1n: Option<f64>,
    #[serde(default, rename = "currentL1")]
    pub current_l1: Option<f64>,
    /// Watts.
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub frequency: Option<f64>,
}

/// Connector with live status, from the charger detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub connector_id: ConnectorId,
    pub ocpp_status: OcppStatus,
    #[serde(default)]
    pub meter: Option<ConnectorMeter>,
    #[serde(default)]
    pub max_amperage: Option<f64>,
}

/// Charger detail including its connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePointDetail {
    #[serde(default)]
    pub id: ChargerId,
    pub name: String,
    pub network_status: NetworkStatus,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

/// Monetary amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One charging session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub start_date: Option<Timestamp>,
    /// Absent while the session is running.
    pub end_date: Option<Timestamp>,
    /// Watt-hours.
    pub total_power_usage: Option<f64>,
    pub total_cost: Option<Cost>,
    pub session_status: Option<String>,
    pub connector_id: Option<ConnectorId>,
}

impl Session {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }
}

/// User-settable "charge now" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePointOverride {
    pub charge_now: bool,
}

/// Daily organisation rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgInsight {
    pub start_date: Timestamp,
    /// Watt-hours.
    #[serde(default)]
    pub power_usage: f64,
    #[serde(default)]
    pub sessions: i64,
}

/// Everything one refresh fetched, keyed by vendor ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub user: UserDetail,
    pub org_briefs: BTreeMap<OrgId, OrgBrief>,
    pub org_insights: BTreeMap<OrgId, Vec<OrgInsight>>,
    pub charge_points: BTreeMap<ChargerId, ChargePoint>,
    pub charge_point_to_org: BTreeMap<ChargerId, OrgId>,
    pub charge_point_details: BTreeMap<ChargerId, ChargePointDetail>,
    pub charge_point_sessions: BTreeMap<ChargerId, Vec<Session>>,
    pub charge_point_override: BTreeMap<ChargerId, Option<ChargePointOverride>>,
    pub connectors: BTreeMap<(ChargerId, ConnectorId), Connector>,
}

impl Snapshot {
    /// Start assembling a snapshot for `user`.
    #[must_use]
    pub fn builder(user: UserDetail) -> SnapshotBuilder {
        SnapshotBuilder::new(user)
    }

    /// Organisation owning a charger.
    #[must_use]
    pub fn org_of(&self, charger_id: &str) -> Option<&OrgBrief> {
        self.charge_point_to_org
            .get(charger_id)
            .and_then(|org_id| self.org_briefs.get(org_id))
    }

    /// Most recent session of a charger.
    #[must_use]
    pub fn latest_session(&self, charger_id: &str) -> Option<&Session> {
        self.charge_point_sessions
            .get(charger_id)
            .and_then(|sessions| sessions.first())
    }

    /// Latest daily insight of an organisation.
    #[must_use]
    pub fn latest_insight(&self, org_id: &str) -> Option<&OrgInsight> {
        self.org_insights
            .get(org_id)
            .and_then(|insights| insights.last())
    }

    /// Override of a charger, `None` when unknown.
    #[must_use]
    pub fn override_of(&self, charger_id: &str) -> Option<ChargePointOverride> {
        self.charge_point_override
            .get(charger_id)
            .copied()
            .flatten()
    }

    #[must_use]
    pub fn connector(&self, charger_id: &str, connector_id: &str) -> Option<&Connector> {
        self.connectors
            .get(&(charger_id.to_string(), connector_id.to_string()))
    }

    /// Connectors of one charger, ordered by connector id.
    pub fn connectors_of<'a>(&'a self, charger_id: &'a str) -> impl Iterator<Item = &'a Connector> {
        self.connectors
            .iter()
            .filter(move |((owner, _), _)| owner == charger_id)
            .map(|(_, connector)| connector)
    }

    /// Chargers grouped by organisation, in listing order.
    #[must_use]
    pub fn charge_points_by_org(&self) -> BTreeMap<&str, Vec<&ChargePoint>> {
        let mut grouped: BTreeMap<&str, Vec<&ChargePoint>> = self
            .org_briefs
            .keys()
            .map(|org_id| (org_id.as_str(), Vec::new()))
            .collect();
        for (charger_id, org_id) in &self.charge_point_to_org {
            if let Some(charge_point) = self.charge_points.get(charger_id) {
                grouped.entry(org_id.as_str()).or_default().push(charge_point);
            }
        }
        grouped
    }

    /// Check key relations between the maps.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] when a charger has no known
    /// organisation, an override exists for a charger that is not online,
    /// or sessions are not ordered newest first.
    pub fn validate(&self) -> Result<(), BridgeError> {
        for charger_id in self.charge_points.keys() {
            let known_org = self
                .charge_point_to_org
                .get(charger_id)
                .is_some_and(|org_id| self.org_briefs.contains_key(org_id));
            if !known_org {
                return Err(inconsistent(format!(
                    "charger {charger_id} has no known organisation"
                )));
            }
        }
        for (charger_id, value) in &self.charge_point_override {
            let online = self
                .charge_point_details
                .get(charger_id)
                .is_some_and(|detail| detail.network_status.is_online());
            if value.is_some() && !online {
                return Err(inconsistent(format!(
                    "override present for charger {charger_id} which is not online"
                )));
            }
        }
        for (charger_id, sessions) in &self.charge_point_sessions {
            let ordered = sessions
                .windows(2)
                .all(|pair| newest_first(&pair[0], &pair[1]) != std::cmp::Ordering::Greater);
            if !ordered {
                return Err(inconsistent(format!(
                    "sessions of charger {charger_id} are not newest first"
                )));
            }
        }
        Ok(())
    }
}

fn inconsistent(reason: String) -> BridgeError {
    ValidationError::InconsistentSnapshot(reason).into()
}

/// Order sessions by start date, newest first, undated last.
fn newest_first(a: &Session, b: &Session) -> std::cmp::Ordering {
    match (a.start_date, b.start_date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

/// Incremental builder used by the refresh routine.
#[derive(Debug)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new(user: UserDetail) -> Self {
        Self {
            snapshot: Snapshot {
                user,
                org_briefs: BTreeMap::new(),
                org_insights: BTreeMap::new(),
                charge_points: BTreeMap::new(),
                charge_point_to_org: BTreeMap::new(),
                charge_point_details: BTreeMap::new(),
                charge_point_sessions: BTreeMap::new(),
                charge_point_override: BTreeMap::new(),
                connectors: BTreeMap::new(),
            },
        }
    }

    /// Record an organisation and its daily insights.
    pub fn org(&mut self, org: OrgBrief, insights: Vec<OrgInsight>) -> &mut Self {
        self.snapshot.org_insights.insert(org.id.clone(), insights);
        self.snapshot.org_briefs.insert(org.id.clone(), org);
        self
    }

    /// Record one charger with everything fetched for it.
    ///
    /// Sessions are sorted newest first; connectors are keyed by
    /// `(charger, connector)`.
    pub fn charger(
        &mut self,
        org_id: &str,
        brief: ChargePoint,
        mut detail: ChargePointDetail,
        mut sessions: Vec<Session>,
        charge_override: Option<ChargePointOverride>,
    ) -> &mut Self {
        let charger_id = brief.id.clone();
        if detail.id.is_empty() {
            detail.id.clone_from(&charger_id);
        }
        sessions.sort_by(newest_first);
        for connector in &detail.connectors {
            self.snapshot.connectors.insert(
                (charger_id.clone(), connector.connector_id.clone()),
                connector.clone(),
            );
        }
        let snapshot = &mut self.snapshot;
        snapshot
            .charge_point_to_org
            .insert(charger_id.clone(), org_id.to_string());
        snapshot
            .charge_point_override
            .insert(charger_id.clone(), charge_override);
        snapshot
            .charge_point_sessions
            .insert(charger_id.clone(), sessions);
        snapshot
            .charge_point_details
            .insert(charger_id.clone(), detail);
        snapshot.charge_points.insert(charger_id, brief);
        self
    }

    /// Validate and return the finished [`Snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Validation`] if the key relations are broken.
    pub fn build(self) -> Result<Snapshot, BridgeError> {
        self.snapshot.validate()?;
        Ok(self.snapshot)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn should_parse_unknown_network_status_as_other() {
        let status: NetworkStatus = serde_json::from_str("\"DEGRADED\"").unwrap();
        assert_eq!(status, NetworkStatus::Other("DEGRADED".to_string()));
        assert!(!status.is_online());
        let lower: NetworkStatus = serde_json::from_str("\"online\"").unwrap();
        assert!(!lower.is_online());
    }

    #[test]
    fn should_mark_only_running_states_session_ready() {
        assert!(OcppStatus::Charging.is_session_ready());
        assert!(OcppStatus::SuspendedEv.is_session_ready());
        assert!(OcppStatus::SuspendedEvse.is_session_ready());
        assert!(!OcppStatus::Available.is_session_ready());
        assert!(!OcppStatus::from("FINISHING".to_string()).is_session_ready());
    }

    #[test]
    fn should_decode_v3_connector_meter() {
        let json = r#"{
            "connectorId": "1",
            "ocppStatus": "CHARGING",
            "meter": {"voltageL1N": 229.5, "currentL1": 15.8, "power": 3600, "frequency": 50.01},
            "maxAmperage": 32
        }"#;
        let connector: Connector = serde_json::from_str(json).unwrap();
        let meter = connector.meter.unwrap();
        assert_eq!(meter.voltage_l1n, Some(229.5));
        assert_eq!(meter.power, Some(3600.0));
        assert_eq!(connector.max_amperage, Some(32.0));
    }

    #[test]
    fn should_sort_sessions_newest_first_with_undated_last() {
        let mut builder = Snapshot::builder(user(vec![org("o1")]));
        builder.org(org("o1"), vec![]).charger(
            "o1",
            brief("cp1", NetworkStatus::Offline),
            detail("cp1", NetworkStatus::Offline, OcppStatus::Available),
            vec![
                session("old", Some(at(1)), Some(at(2))),
                session("undated", None, None),
                session("new", Some(at(5)), None),
            ],
            None,
        );
        let snapshot = builder.build().unwrap();

        let ids: Vec<_> = snapshot.charge_point_sessions["cp1"]
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, ["new", "old", "undated"]);
        assert_eq!(snapshot.latest_session("cp1").unwrap().id, "new");
    }

    #[test]
    fn should_key_connectors_by_charger_and_connector() {
        let mut builder = Snapshot::builder(user(vec![org("o1")]));
        builder
            .org(org("o1"), vec![])
            .charger(
                "o1",
                brief("cp1", NetworkStatus::Online),
                detail("cp1", NetworkStatus::Online, OcppStatus::Charging),
                vec![],
                Some(ChargePointOverride { charge_now: true }),
            )
            .charger(
                "o1",
                brief("cp2", NetworkStatus::Offline),
                detail("cp2", NetworkStatus::Offline, OcppStatus::Unavailable),
                vec![],
                None,
            );
        let snapshot = builder.build().unwrap();

        assert_eq!(snapshot.connectors.len(), 2);
        assert_eq!(
            snapshot.connector("cp2", "1").unwrap().ocpp_status,
            OcppStatus::Unavailable
        );
        assert_eq!(snapshot.connectors_of("cp1").count(), 1);
        assert_eq!(snapshot.org_of("cp2").unwrap().id, "o1");
        assert_eq!(
            snapshot.override_of("cp1"),
            Some(ChargePointOverride { charge_now: true })
        );
        assert_eq!(snapshot.override_of("cp2"), None);
    }

    #[test]
    fn should_reject_override_for_offline_charger() {
        let mut builder = Snapshot::builder(user(vec![org("o1")]));
        builder.org(org("o1"), vec![]).charger(
            "o1",
            brief("cp1", NetworkStatus::Offline),
            detail("cp1", NetworkStatus::Offline, OcppStatus::Available),
            vec![],
            Some(ChargePointOverride { charge_now: false }),
        );
        assert!(matches!(
            builder.build(),
            Err(BridgeError::Validation(ValidationError::InconsistentSnapshot(_)))
        ));
    }

    #[test]
    fn should_reject_charger_of_unknown_org() {
        let mut builder = Snapshot::builder(user(vec![]));
        builder.charger(
            "ghost",
            brief("cp1", NetworkStatus::Offline),
            detail("cp1", NetworkStatus::Offline, OcppStatus::Available),
            vec![],
            None,
        );
        assert!(builder.build().is_err());
    }

    #[test]
    fn should_group_charge_points_by_org() {
        let mut builder = Snapshot::builder(user(vec![org("o1"), org("o2")]));
        builder
            .org(org("o1"), vec![])
            .org(org("o2"), vec![])
            .charger(
                "o1",
                brief("cp1", NetworkStatus::Offline),
                detail("cp1", NetworkStatus::Offline, OcppStatus::Available),
                vec![],
                None,
            );
        let snapshot = builder.build().unwrap();
        let grouped = snapshot.charge_points_by_org();

        assert_eq!(grouped["o1"].len(), 1);
        assert_eq!(grouped["o1"][0].id, "cp1");
        assert!(grouped["o2"].is_empty());
    }

    #[test]
    fn should_return_last_insight_as_latest() {
        let mut builder = Snapshot::builder(user(vec![org("o1")]));
        builder.org(
            org("o1"),
            vec![
                OrgInsight {
                    start_date: at(0),
                    power_usage: 100.0,
                    sessions: 1,
                },
                OrgInsight {
                    start_date: at(1),
                    power_usage: 250.0,
                    sessions: 3,
                },
            ],
        );
        let snapshot = builder.build().unwrap();
        assert_eq!(snapshot.latest_insight("o1").unwrap().sessions, 3);
        assert!(snapshot.latest_insight("o2").is_none());
    }
}
