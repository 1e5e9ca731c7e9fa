//! Refresh routine: one full pass over the account, producing a [`Snapshot`].
//!
//! The pass is linear: user, then per organisation its chargers and
//! insights, then per charger its detail, sessions and (when online) its
//! override. An authorization failure anywhere triggers exactly one
//! re-authentication and one retry of the whole pass.

use std::sync::Arc;

use evnex_bridge_domain::error::{BoxError, BridgeError};
use evnex_bridge_domain::snapshot::{
    ChargePoint, ChargePointDetail, ChargePointOverride, OrgBrief, OrgInsight, Session, Snapshot,
};
use tracing::{debug, info, warn};

use crate::ports::{ApiError, EvnexApi, TokenStore};

/// Why a refresh did not produce a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Authorization failed again after re-authenticating.
    #[error("authentication failed")]
    AuthFailed(#[source] ApiError),

    /// Any other failure; the previous snapshot stays in place.
    #[error("update failed")]
    UpdateFailed(#[source] BoxError),
}

impl RefreshError {
    /// Convert into the port-crossing [`BridgeError`].
    #[must_use]
    pub fn into_domain(self) -> BridgeError {
        match self {
            Self::AuthFailed(_) => BridgeError::Auth(Box::new(self)),
            Self::UpdateFailed(_) => BridgeError::Upstream(Box::new(self)),
        }
    }
}

impl From<ApiError> for RefreshError {
    fn from(err: ApiError) -> Self {
        Self::UpdateFailed(Box::new(err))
    }
}

type ChargerData = (ChargePointDetail, Vec<Session>, Option<ChargePointOverride>);

/// Settings of one configured account.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Key under which tokens are persisted.
    pub entry_id: String,
    /// Day window of the organisation insight fetch.
    pub insight_days: u32,
}

/// Builds snapshots from the vendor API.
pub struct RefreshService<A, T> {
    api: Arc<A>,
    tokens: Arc<T>,
    settings: RefreshSettings,
}

impl<A, T> RefreshService<A, T>
where
    A: EvnexApi,
    T: TokenStore,
{
    /// Create a new service backed by the given API and token store.
    pub fn new(api: Arc<A>, tokens: Arc<T>, settings: RefreshSettings) -> Self {
        Self {
            api,
            tokens,
            settings,
        }
    }

    /// Run one refresh, re-authenticating once on an authorization failure.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::AuthFailed`] when authorization fails again
    /// after re-authenticating, and [`RefreshError::UpdateFailed`] for any
    /// other failure.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        match self.fetch().await {
            Ok(snapshot) => Ok(Arc::new(snapshot)),
            Err(FetchError::Api(err)) if err.is_auth() => {
                debug!("Refreshing auth and trying again");
                self.api.authenticate().await.map_err(|err| {
                    if err.is_auth() {
                        warn!("Re-authentication was rejected");
                        RefreshError::AuthFailed(err)
                    } else {
                        RefreshError::from(err)
                    }
                })?;
                match self.fetch().await {
                    Ok(snapshot) => Ok(Arc::new(snapshot)),
                    Err(FetchError::Api(err)) if err.is_auth() => {
                        warn!("Session token is invalid and re-login did not help");
                        Err(RefreshError::AuthFailed(err))
                    }
                    Err(err) => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        info!("Getting user detail");
        let user = self.api.get_user_detail().await?;

        let mut builder = Snapshot::builder(user.clone());
        for org in &user.organisations {
            info!(org = %org.name, "Getting charge points");
            let charge_points = self.org_charge_points(org).await?;
            debug!(org = %org.name, "Getting org insights");
            let insights = self.org_insights(org).await?;
            builder.org(org.clone(), insights);

            for charge_point in charge_points {
                let (detail, sessions, charge_override) =
                    self.charger_data(&charge_point).await?;
                builder.charger(&org.id, charge_point, detail, sessions, charge_override);
            }
        }
        let snapshot = builder.build()?;
        self.persist_tokens();
        Ok(snapshot)
    }

    async fn charger_data(
        &self,
        charge_point: &ChargePoint,
    ) -> Result<ChargerData, ApiError> {
        let id = charge_point.id.as_str();
        debug!(charger = %charge_point.name, "Getting charge point detail");
        let detail = self.api.get_charge_point_detail_v3(id).await?;
        debug!(charger = %charge_point.name, "Getting charge point sessions");
        let sessions = self.api.get_charge_point_sessions(id).await?;

        let charge_override = if detail.network_status.is_online() {
            debug!(charger = %charge_point.name, "Getting charge point override");
            match self.api.get_charge_point_override(id).await {
                Ok(charge_override) => Some(charge_override),
                Err(ApiError::Timeout) => {
                    warn!(charger = %charge_point.name, "Timed out getting charge point override");
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            debug!(
                charger = %charge_point.name,
                status = %detail.network_status,
                "Not getting charge point override as charge point is not online"
            );
            None
        };
        Ok((detail, sessions, charge_override))
    }

    async fn org_charge_points(&self, org: &OrgBrief) -> Result<Vec<ChargePoint>, ApiError> {
        match self.api.get_org_charge_points(&org.id).await {
            Err(ApiError::Rejected { status, .. }) => {
                debug!(org = %org.name, status, "Charge point listing rejected by id, retrying with slug");
                self.api.get_org_charge_points(&org.slug).await
            }
            other => other,
        }
    }

    async fn org_insights(&self, org: &OrgBrief) -> Result<Vec<OrgInsight>, ApiError> {
        let days = self.settings.insight_days;
        match self.api.get_org_insight(&org.id, days).await {
            Err(ApiError::Rejected { status, .. }) => {
                debug!(org = %org.name, status, "Insight fetch rejected by id, retrying with slug");
                self.api.get_org_insight(&org.slug, days).await
            }
            other => other,
        }
    }

    fn persist_tokens(&self) {
        let tokens = self.api.tokens();
        if let Err(err) = self.tokens.save(&self.settings.entry_id, &tokens) {
            warn!(error = %err, "Failed to persist session tokens");
        }
    }
}

#[derive(Debug)]
enum FetchError {
    Api(ApiError),
    Inconsistent(BridgeError),
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<BridgeError> for FetchError {
    fn from(err: BridgeError) -> Self {
        Self::Inconsistent(err)
    }
}

impl From<FetchError> for RefreshError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Api(err) => err.into(),
            FetchError::Inconsistent(err) => Self::UpdateFailed(Box::new(err)),
        }
    }
}
