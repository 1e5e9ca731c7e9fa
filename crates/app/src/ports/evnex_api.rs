//! Vendor API port: every call the bridge makes against the Evnex cloud.
//!
//! Implementations own the session tokens: they authenticate lazily when
//! no access token is known and expose the current triple through
//! [`EvnexApi::tokens`] so the application can persist it.

use std::future::Future;

use evnex_bridge_domain::error::{BoxError, BridgeError};
use evnex_bridge_domain::snapshot::{
    ChargePoint, ChargePointDetail, ChargePointOverride, OrgInsight, Session, UserDetail,
};
use evnex_bridge_domain::token::TokenSet;

/// Failure of a single vendor call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The vendor rejected the session (401/403) or the credentials.
    #[error("not authorized")]
    NotAuthorized,

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Any other non-success status.
    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connection-level failure.
    #[error("transport error")]
    Transport(#[source] BoxError),

    /// The response body did not have the expected shape.
    #[error("unexpected response body")]
    Decode(#[source] BoxError),
}

impl ApiError {
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthorized)
    }

    /// Convert into the port-crossing [`BridgeError`].
    #[must_use]
    pub fn into_domain(self) -> BridgeError {
        if self.is_auth() {
            BridgeError::Auth(Box::new(self))
        } else {
            BridgeError::Upstream(Box::new(self))
        }
    }
}

/// One step of a charging profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargingProfilePeriod {
    /// Current limit in `units`.
    pub limit: f64,
    /// Offset from the profile start, in seconds.
    pub start: u32,
}

/// Load-management profile applied to a charger.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    pub periods: Vec<ChargingProfilePeriod>,
    pub enabled: bool,
    /// Profile duration in seconds.
    pub duration: u32,
    pub units: &'static str,
}

impl LoadProfile {
    /// A day-long profile capping the current at `amps`.
    #[must_use]
    pub fn max_current(amps: f64) -> Self {
        Self {
            periods: vec![ChargingProfilePeriod {
                limit: amps,
                start: 0,
            }],
            enabled: true,
            duration: 86_400,
            units: "A",
        }
    }
}

/// The Evnex cloud API.
pub trait EvnexApi: Send + Sync {
    /// Sign in with the configured credentials, replacing the held tokens.
    fn authenticate(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Current token triple.
    fn tokens(&self) -> TokenSet;

    /// Seed the client with previously persisted tokens.
    fn set_tokens(&self, tokens: TokenSet);

    fn get_user_detail(&self) -> impl Future<Output = Result<UserDetail, ApiError>> + Send;

    /// List chargers of an organisation, addressed by id or slug.
    fn get_org_charge_points(
        &self,
        org_ref: &str,
    ) -> impl Future<Output = Result<Vec<ChargePoint>, ApiError>> + Send;

    /// Daily insights of an organisation over the last `days` days, oldest first.
    fn get_org_insight(
        &self,
        org_ref: &str,
        days: u32,
    ) -> impl Future<Output = Result<Vec<OrgInsight>, ApiError>> + Send;

    fn get_charge_point_detail_v3(
        &self,
        charger_id: &str,
    ) -> impl Future<Output = Result<ChargePointDetail, ApiError>> + Send;

    fn get_charge_point_sessions(
        &self,
        charger_id: &str,
    ) -> impl Future<Output = Result<Vec<Session>, ApiError>> + Send;

    fn get_charge_point_override(
        &self,
        charger_id: &str,
    ) -> impl Future<Output = Result<ChargePointOverride, ApiError>> + Send;

    fn set_charge_point_override(
        &self,
        charger_id: &str,
        charge_now: bool,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn enable_connector(
        &self,
        org_id: &str,
        charger_id: &str,
        connector_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn disable_connector(
        &self,
        org_id: &str,
        charger_id: &str,
        connector_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn set_charger_load_profile(
        &self,
        charger_id: &str,
        profile: &LoadProfile,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Stop the running session of a charger.
    fn stop_charge_point(
        &self,
        charger_id: &str,
        org_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
