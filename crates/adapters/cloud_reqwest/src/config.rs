//! Cloud endpoint configuration.

use std::time::Duration;

use serde::Deserialize;

/// Endpoints and client settings of the vendor cloud.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Base url of the client API, without a trailing slash.
    pub api_base_url: String,
    /// Cognito identity provider endpoint.
    pub cognito_url: String,
    /// Cognito app client id.
    pub client_id: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl CloudConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://client-api.evnex.io".to_string(),
            cognito_url: "https://cognito-idp.ap-southeast-2.amazonaws.com/".to_string(),
            client_id: "rol3lsv2vg41783550i18r7vi".to_string(),
            timeout_secs: 30,
        }
    }
}
