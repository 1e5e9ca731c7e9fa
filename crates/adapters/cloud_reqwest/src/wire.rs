//! Request and response shapes of the vendor API and of Cognito.

use std::collections::BTreeMap;

use evnex_bridge_app::ports::LoadProfile;
use evnex_bridge_domain::snapshot::{ConnectorId, Cost, Session};
use evnex_bridge_domain::time::Timestamp;
use serde::{Deserialize, Serialize};

/// `{ "data": ... }`
#[derive(Debug, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// `{ "items": [...] }`
#[derive(Debug, Deserialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

/// JSON:API style resource of the v3 endpoints.
#[derive(Debug, Deserialize)]
pub struct Resource<T> {
    pub id: String,
    pub attributes: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttributes {
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub total_power_usage: Option<f64>,
    pub total_cost: Option<Cost>,
    pub session_status: Option<String>,
    pub connector_id: Option<ConnectorId>,
}

impl Resource<SessionAttributes> {
    pub fn into_session(self) -> Session {
        let Self { id, attributes } = self;
        Session {
            id,
            start_date: attributes.start_date,
            end_date: attributes.end_date,
            total_power_usage: attributes.total_power_usage,
            total_cost: attributes.total_cost,
            session_status: attributes.session_status,
            connector_id: attributes.connector_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideBody {
    pub charge_now: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAvailabilityBody<'a> {
    pub connector_id: &'a str,
    pub change_availability_type: &'static str,
}

impl<'a> ChangeAvailabilityBody<'a> {
    pub fn new(connector_id: &'a str, enabled: bool) -> Self {
        Self {
            connector_id,
            change_availability_type: if enabled { "Operative" } else { "Inoperative" },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStopBody<'a> {
    pub connector_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProfilePeriod {
    pub limit: f64,
    pub start: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadProfileBody {
    pub charging_profile_periods: Vec<ProfilePeriod>,
    pub enabled: bool,
    pub duration: u32,
    pub units: &'static str,
}

impl From<&LoadProfile> for LoadProfileBody {
    fn from(profile: &LoadProfile) -> Self {
        Self {
            charging_profile_periods: profile
                .periods
                .iter()
                .map(|p| ProfilePeriod {
                    limit: p.limit,
                    start: p.start,
                })
                .collect(),
            enabled: profile.enabled,
            duration: profile.duration,
            units: profile.units,
        }
    }
}

/// Cognito `InitiateAuth` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuth<'a> {
    pub auth_flow: &'static str,
    pub client_id: &'a str,
    pub auth_parameters: BTreeMap<&'static str, &'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateAuthResponse {
    pub authentication_result: AuthenticationResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Absent when refreshing.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body of a rejected Cognito call.
#[derive(Debug, Deserialize)]
pub struct CognitoError {
    #[serde(rename = "__type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl CognitoError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "NotAuthorizedException" | "UserNotFoundException" | "PasswordResetRequiredException"
        )
    }
}
