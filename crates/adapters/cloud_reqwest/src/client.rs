//! HTTPS client for the vendor cloud.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use evnex_bridge_app::ports::{ApiError, EvnexApi, LoadProfile};
use evnex_bridge_domain::snapshot::{
    ChargePoint, ChargePointDetail, ChargePointOverride, OrgInsight, Session, UserDetail,
};
use evnex_bridge_domain::token::TokenSet;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info, warn};

use crate::config::CloudConfig;
use crate::error::CloudError;
use crate::wire::{
    AuthenticationResult, ChangeAvailabilityBody, CognitoError, Data, InitiateAuth,
    InitiateAuthResponse, Items, LoadProfileBody, OverrideBody, RemoteStopBody, Resource,
    SessionAttributes,
};

const AMZ_TARGET: &str = "X-Amz-Target";
const INITIATE_AUTH: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Connector addressed by remote stop.
const STOP_CONNECTOR: &str = "1";

/// Account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Vendor API client holding the session tokens.
pub struct EvnexClient {
    http: Client,
    config: CloudConfig,
    credentials: Credentials,
    tokens: RwLock<TokenSet>,
}

impl EvnexClient {
    /// Create a client without tokens; the first call authenticates.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::Build`] if the HTTP client cannot be built.
    pub fn new(config: CloudConfig, credentials: Credentials) -> Result<Self, CloudError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(CloudError::Build)?;
        Ok(Self {
            http,
            config,
            credentials,
            tokens: RwLock::new(TokenSet::default()),
        })
    }

    fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    fn store(&self, result: AuthenticationResult) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access_token = Some(result.access_token);
        if result.id_token.is_some() {
            tokens.id_token = result.id_token;
        }
        if result.refresh_token.is_some() {
            tokens.refresh_token = result.refresh_token;
        }
    }

    async fn initiate_auth(
        &self,
        flow: &'static str,
        parameters: BTreeMap<&'static str, &str>,
    ) -> Result<AuthenticationResult, CloudError> {
        let body = InitiateAuth {
            auth_flow: flow,
            client_id: &self.config.client_id,
            auth_parameters: parameters,
        };
        let payload = serde_json::to_vec(&body).map_err(CloudError::Decode)?;
        let response = self
            .http
            .post(&self.config.cognito_url)
            .header(AMZ_TARGET, INITIATE_AUTH)
            .header(CONTENT_TYPE, AMZ_JSON)
            .body(payload)
            .send()
            .await
            .map_err(CloudError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(CloudError::from_reqwest)?;
        if !status.is_success() {
            let rejection: Option<CognitoError> = serde_json::from_str(&text).ok();
            if let Some(rejection) = rejection.filter(CognitoError::is_auth) {
                warn!(
                    flow,
                    kind = %rejection.kind,
                    message = rejection.message.as_deref().unwrap_or_default(),
                    "Sign-in rejected"
                );
                return Err(CloudError::Unauthorized);
            }
            return Err(CloudError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        let response: InitiateAuthResponse =
            serde_json::from_str(&text).map_err(CloudError::Decode)?;
        Ok(response.authentication_result)
    }

    async fn login(&self) -> Result<(), CloudError> {
        if let Some(refresh_token) = self.refresh_token() {
            debug!("Refreshing session tokens");
            let parameters = BTreeMap::from([("REFRESH_TOKEN", refresh_token.as_str())]);
            match self.initiate_auth("REFRESH_TOKEN_AUTH", parameters).await {
                Ok(result) => {
                    self.store(result);
                    return Ok(());
                }
                Err(CloudError::Unauthorized | CloudError::Status { .. }) => {
                    warn!("Refresh token rejected, signing in with password");
                }
                Err(err) => return Err(err),
            }
        }
        info!(username = %self.credentials.username, "Signing in");
        let parameters = BTreeMap::from([
            ("USERNAME", self.credentials.username.as_str()),
            ("PASSWORD", self.credentials.password.as_str()),
        ]);
        let result = self.initiate_auth("USER_PASSWORD_AUTH", parameters).await?;
        self.store(result);
        Ok(())
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, CloudError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = match self.access_token() {
            Some(token) => token,
            None => {
                self.login().await?;
                self.access_token().ok_or(CloudError::Unauthorized)?
            }
        };
        let url = format!("{}{path}", self.config.api_base_url.trim_end_matches('/'));
        debug!(%method, %url, "Calling vendor API");
        let mut request = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, token)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(CloudError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(CloudError::from_reqwest)?;
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(CloudError::Unauthorized);
        }
        if !status.is_success() {
            return Err(CloudError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        let text = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str(text).map_err(CloudError::Decode)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CloudError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    async fn command<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<(), ApiError> {
        self.request::<B, IgnoredAny>(method, path, Some(body))
            .await
            .map(|_| ())
            .map_err(CloudError::into_api)
    }
}

impl EvnexApi for EvnexClient {
    async fn authenticate(&self) -> Result<(), ApiError> {
        self.login().await.map_err(CloudError::into_api)
    }

    fn tokens(&self) -> TokenSet {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_tokens(&self, tokens: TokenSet) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
    }

    async fn get_user_detail(&self) -> Result<UserDetail, ApiError> {
        let body: Data<UserDetail> = self.get("/v2/apps/user").await?;
        Ok(body.data)
    }

    async fn get_org_charge_points(&self, org_ref: &str) -> Result<Vec<ChargePoint>, ApiError> {
        let body: Data<Items<ChargePoint>> = self
            .get(&format!("/v2/apps/organisations/{org_ref}/charge-points"))
            .await?;
        Ok(body.data.items)
    }

    async fn get_org_insight(&self, org_ref: &str, days: u32) -> Result<Vec<OrgInsight>, ApiError> {
        let body: Data<Items<OrgInsight>> = self
            .get(&format!(
                "/v2/apps/organisations/{org_ref}/summary/insights?days={days}"
            ))
            .await?;
        Ok(body.data.items)
    }

    async fn get_charge_point_detail_v3(
        &self,
        charger_id: &str,
    ) -> Result<ChargePointDetail, ApiError> {
        let body: Data<Resource<ChargePointDetail>> = self
            .get(&format!("/v3/charge-points/{charger_id}"))
            .await?;
        let Resource { id, mut attributes } = body.data;
        attributes.id = id;
        Ok(attributes)
    }

    async fn get_charge_point_sessions(&self, charger_id: &str) -> Result<Vec<Session>, ApiError> {
        let body: Data<Vec<Resource<SessionAttributes>>> = self
            .get(&format!("/v3/charge-points/{charger_id}/sessions"))
            .await?;
        Ok(body.data.into_iter().map(Resource::into_session).collect())
    }

    async fn get_charge_point_override(
        &self,
        charger_id: &str,
    ) -> Result<ChargePointOverride, ApiError> {
        let body: Data<ChargePointOverride> = self
            .get(&format!("/v2/apps/charge-points/{charger_id}/override"))
            .await?;
        Ok(body.data)
    }

    async fn set_charge_point_override(
        &self,
        charger_id: &str,
        charge_now: bool,
    ) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!("/v2/apps/charge-points/{charger_id}/override"),
            &OverrideBody { charge_now },
        )
        .await
    }

    async fn enable_connector(
        &self,
        org_id: &str,
        charger_id: &str,
        connector_id: &str,
    ) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!(
                "/v2/apps/organisations/{org_id}/charge-points/{charger_id}/commands/change-availability"
            ),
            &ChangeAvailabilityBody::new(connector_id, true),
        )
        .await
    }

    async fn disable_connector(
        &self,
        org_id: &str,
        charger_id: &str,
        connector_id: &str,
    ) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!(
                "/v2/apps/organisations/{org_id}/charge-points/{charger_id}/commands/change-availability"
            ),
            &ChangeAvailabilityBody::new(connector_id, false),
        )
        .await
    }

    async fn set_charger_load_profile(
        &self,
        charger_id: &str,
        profile: &LoadProfile,
    ) -> Result<(), ApiError> {
        self.command(
            Method::PUT,
            &format!("/v2/apps/charge-points/{charger_id}/load-management"),
            &LoadProfileBody::from(profile),
        )
        .await
    }

    async fn stop_charge_point(&self, charger_id: &str, org_id: &str) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!(
                "/v2/apps/organisations/{org_id}/charge-points/{charger_id}/commands/remote-stop-transaction"
            ),
            &RemoteStopBody {
                connector_id: STOP_CONNECTOR,
            },
        )
        .await
    }
}
