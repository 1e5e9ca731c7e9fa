//! In-memory port fakes and a sample account shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::TimeZone;
use evnex_bridge_domain::snapshot::{
    ChargePoint, ChargePointDetail, ChargePointDetails, ChargePointOverride, Connector,
    ConnectorMeter, Cost, NetworkStatus, OcppStatus, OrgBrief, OrgInsight, Session, Snapshot,
    UserDetail,
};
use evnex_bridge_domain::time::Timestamp;
use evnex_bridge_domain::token::TokenSet;

use crate::ports::{ApiError, EvnexApi, LoadProfile, TokenStore, TokenStoreError};

pub const ORG: &str = "6f1e2d3c-4b5a-4c6d-8e7f-0a1b2c3d4e5f";
pub const ORG_SLUG: &str = "home";
pub const CP_ONLINE: &str = "1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d";
pub const CP_OFFLINE: &str = "9f8e7d6c-5b4a-4c3d-9e2f-1a0b9c8d7e6f";

pub fn at(hour: u32) -> Timestamp {
    chrono::Utc
        .with_ymd_and_hms(2024, 6, 1, hour, 0, 0)
        .unwrap()
}

pub fn org_brief() -> OrgBrief {
    OrgBrief {
        id: ORG.to_string(),
        slug: ORG_SLUG.to_string(),
        name: "Home".to_string(),
        tier: Some("FREE".to_string()),
        is_default: true,
    }
}

pub fn user() -> UserDetail {
    UserDetail {
        id: "user-1".to_string(),
        name: Some("Sam".to_string()),
        email: Some("sam@example.com".to_string()),
        organisations: vec![org_brief()],
    }
}

pub fn insights() -> Vec<OrgInsight> {
    vec![
        OrgInsight {
            start_date: at(0) - chrono::Duration::days(1),
            power_usage: 1000.0,
            sessions: 1,
        },
        OrgInsight {
            start_date: at(0),
            power_usage: 4200.0,
            sessions: 2,
        },
    ]
}

fn brief(id: &str, name: &str, status: NetworkStatus) -> ChargePoint {
    ChargePoint {
        id: id.to_string(),
        name: name.to_string(),
        serial: Some(format!("SN-{}", name.to_uppercase())),
        network_status: status,
        details: ChargePointDetails {
            model: Some("E7 Plus".to_string()),
            firmware: Some("2.1.0".to_string()),
        },
        connectors: vec![],
    }
}

pub fn online_brief() -> ChargePoint {
    brief(CP_ONLINE, "Garage", NetworkStatus::Online)
}

pub fn offline_brief() -> ChargePoint {
    brief(CP_OFFLINE, "Driveway", NetworkStatus::Offline)
}

pub fn online_detail() -> ChargePointDetail {
    ChargePointDetail {
        id: CP_ONLINE.to_string(),
        name: "Garage".to_string(),
        network_status: NetworkStatus::Online,
        serial: Some("SN-GARAGE".to_string()),
        connectors: vec![Connector {
            connector_id: "1".to_string(),
            ocpp_status: OcppStatus::Charging,
            meter: Some(ConnectorMeter {
                voltage_l1n: Some(230.0),
                current_l1: Some(32.0),
                power: Some(7360.0),
                frequency: Some(50.0),
            }),
            max_amperage: Some(32.0),
        }],
    }
}

pub fn offline_detail() -> ChargePointDetail {
    ChargePointDetail {
        id: CP_OFFLINE.to_string(),
        name: "Driveway".to_string(),
        network_status: NetworkStatus::Offline,
        serial: Some("SN-DRIVEWAY".to_string()),
        connectors: vec![Connector {
            connector_id: "1".to_string(),
            ocpp_status: OcppStatus::Unavailable,
            meter: None,
            max_amperage: None,
        }],
    }
}

fn session(id: &str, start: Timestamp, end: Option<Timestamp>, wh: f64) -> Session {
    Session {
        id: id.to_string(),
        start_date: Some(start),
        end_date: end,
        total_power_usage: Some(wh),
        total_cost: Some(Cost {
            amount: Some(1.2),
            currency: Some("NZD".to_string()),
        }),
        session_status: Some(if end.is_some() { "COMPLETED" } else { "ACTIVE" }.to_string()),
        connector_id: Some("1".to_string()),
    }
}

/// Oldest first, the way some API versions return them.
pub fn online_sessions() -> Vec<Session> {
    vec![
        session("s-old", at(8), Some(at(9)), 3000.0),
        session("s-active", at(10), None, 7500.0),
    ]
}

pub fn offline_sessions() -> Vec<Session> {
    vec![session("s-done", at(1), Some(at(3)), 5000.0)]
}

pub fn charge_now() -> ChargePointOverride {
    ChargePointOverride { charge_now: true }
}

/// The snapshot a refresh of [`sample_api`] yields.
pub fn sample_snapshot() -> Snapshot {
    let mut builder = Snapshot::builder(user());
    builder
        .org(org_brief(), insights())
        .charger(
            ORG,
            online_brief(),
            online_detail(),
            online_sessions(),
            Some(charge_now()),
        )
        .charger(ORG, offline_brief(), offline_detail(), offline_sessions(), None);
    builder.build().unwrap()
}

/// Scripted vendor API state.
#[derive(Debug, Default)]
pub struct FakeState {
    pub user: Option<UserDetail>,
    /// Charger listings by organisation reference (id or slug).
    pub charge_points: HashMap<String, Vec<ChargePoint>>,
    pub insights: HashMap<String, Vec<OrgInsight>>,
    pub details: HashMap<String, ChargePointDetail>,
    pub sessions: HashMap<String, Vec<Session>>,
    pub overrides: HashMap<String, ChargePointOverride>,
    pub override_timeouts: HashSet<String>,
    /// Upcoming user fetches answered with `NotAuthorized`.
    pub unauthorized_user_fetches: usize,
    /// Upcoming charger listings answered with `NotAuthorized`.
    pub unauthorized_listings: usize,
    pub reject_authenticate: bool,
    pub tokens: TokenSet,
    pub authentications: usize,
    pub calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

pub fn sample_api() -> FakeApi {
    let api = FakeApi::default();
    api.update(|s| {
        s.user = Some(user());
        s.charge_points
            .insert(ORG.to_string(), vec![online_brief(), offline_brief()]);
        s.insights.insert(ORG.to_string(), insights());
        s.details.insert(CP_ONLINE.to_string(), online_detail());
        s.details.insert(CP_OFFLINE.to_string(), offline_detail());
        s.sessions.insert(CP_ONLINE.to_string(), online_sessions());
        s.sessions.insert(CP_OFFLINE.to_string(), offline_sessions());
        s.overrides.insert(CP_ONLINE.to_string(), charge_now());
        s.tokens = TokenSet {
            id_token: Some("id-0".to_string()),
            refresh_token: Some("refresh-0".to_string()),
            access_token: Some("access-0".to_string()),
        };
    });
    api
}

fn not_found() -> ApiError {
    ApiError::Rejected {
        status: 404,
        body: "not found".to_string(),
    }
}

impl FakeApi {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.lock());
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn authentications(&self) -> usize {
        self.lock().authentications
    }

    fn record(&self, call: String) -> MutexGuard<'_, FakeState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }

    fn log(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl EvnexApi for FakeApi {
    async fn authenticate(&self) -> Result<(), ApiError> {
        let mut state = self.record("authenticate".to_string());
        if state.reject_authenticate {
            return Err(ApiError::NotAuthorized);
        }
        state.authentications += 1;
        let n = state.authentications;
        state.tokens = TokenSet {
            id_token: Some(format!("id-{n}")),
            refresh_token: Some(format!("refresh-{n}")),
            access_token: Some(format!("access-{n}")),
        };
        Ok(())
    }

    fn tokens(&self) -> TokenSet {
        self.lock().tokens.clone()
    }

    fn set_tokens(&self, tokens: TokenSet) {
        self.lock().tokens = tokens;
    }

    async fn get_user_detail(&self) -> Result<UserDetail, ApiError> {
        let mut state = self.record("get_user_detail".to_string());
        if state.unauthorized_user_fetches > 0 {
            state.unauthorized_user_fetches -= 1;
            return Err(ApiError::NotAuthorized);
        }
        state.user.clone().ok_or_else(not_found)
    }

    async fn get_org_charge_points(&self, org_ref: &str) -> Result<Vec<ChargePoint>, ApiError> {
        let mut state = self.record(format!("get_org_charge_points {org_ref}"));
        if state.unauthorized_listings > 0 {
            state.unauthorized_listings -= 1;
            return Err(ApiError::NotAuthorized);
        }
        state.charge_points.get(org_ref).cloned().ok_or_else(not_found)
    }

    async fn get_org_insight(&self, org_ref: &str, days: u32) -> Result<Vec<OrgInsight>, ApiError> {
        let state = self.record(format!("get_org_insight {org_ref} {days}"));
        state.insights.get(org_ref).cloned().ok_or_else(not_found)
    }

    async fn get_charge_point_detail_v3(
        &self,
        charger_id: &str,
    ) -> Result<ChargePointDetail, ApiError> {
        let state = self.record(format!("get_charge_point_detail_v3 {charger_id}"));
        state.details.get(charger_id).cloned().ok_or_else(not_found)
    }

    async fn get_charge_point_sessions(&self, charger_id: &str) -> Result<Vec<Session>, ApiError> {
        let state = self.record(format!("get_charge_point_sessions {charger_id}"));
        Ok(state.sessions.get(charger_id).cloned().unwrap_or_default())
    }

    async fn get_charge_point_override(
        &self,
        charger_id: &str,
    ) -> Result<ChargePointOverride, ApiError> {
        let state = self.record(format!("get_charge_point_override {charger_id}"));
        if state.override_timeouts.contains(charger_id) {
            return Err(ApiError::Timeout);
        }
        state.overrides.get(charger_id).copied().ok_or_else(not_found)
    }

    async fn set_charge_point_override(
        &self,
        charger_id: &str,
        charge_now: bool,
    ) -> Result<(), ApiError> {
        let mut state = self.record(format!("set_charge_point_override {charger_id} {charge_now}"));
        state
            .overrides
            .insert(charger_id.to_string(), ChargePointOverride { charge_now });
        Ok(())
    }

    async fn enable_connector(
        &self,
        org_id: &str,
        charger_id: &str,
        connector_id: &str,
    ) -> Result<(), ApiError> {
        self.log(format!("enable_connector {org_id} {charger_id} {connector_id}"));
        Ok(())
    }

    async fn disable_connector(
        &self,
        org_id: &str,
        charger_id: &str,
        connector_id: &str,
    ) -> Result<(), ApiError> {
        self.log(format!("disable_connector {org_id} {charger_id} {connector_id}"));
        Ok(())
    }

    async fn set_charger_load_profile(
        &self,
        charger_id: &str,
        profile: &LoadProfile,
    ) -> Result<(), ApiError> {
        let limit = profile.periods.first().map_or(0.0, |p| p.limit);
        self.log(format!(
            "set_charger_load_profile {charger_id} {limit}{} {}s",
            profile.units, profile.duration
        ));
        Ok(())
    }

    async fn stop_charge_point(&self, charger_id: &str, org_id: &str) -> Result<(), ApiError> {
        self.log(format!("stop_charge_point {charger_id} {org_id}"));
        Ok(())
    }
}

/// Token store keeping every save in memory.
#[derive(Debug, Default)]
pub struct FakeTokenStore {
    pub entries: Mutex<HashMap<String, TokenSet>>,
    pub saves: Mutex<Vec<(String, TokenSet)>>,
    pub fail_saves: bool,
}

impl FakeTokenStore {
    pub fn saves(&self) -> Vec<(String, TokenSet)> {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for FakeTokenStore {
    fn load(&self, key: &str) -> Option<TokenSet> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, tokens: &TokenSet) -> Result<(), TokenStoreError> {
        if self.fail_saves {
            return Err(TokenStoreError("disk full".into()));
        }
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), tokens.clone()));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), tokens.clone());
        Ok(())
    }
}
