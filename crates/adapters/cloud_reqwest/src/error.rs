//! Cloud adapter error types.

use evnex_bridge_app::ports::ApiError;
use evnex_bridge_domain::error::BridgeError;

/// Errors specific to the cloud adapter.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    /// The vendor rejected the credentials or the access token.
    #[error("not authorized")]
    Unauthorized,

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The vendor answered with a non-success status.
    #[error("unexpected status {status}")]
    Status { status: u16, body: String },

    /// The request could not be sent or its body could not be read.
    #[error("HTTP transport error")]
    Transport(#[source] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to decode response")]
    Decode(#[source] serde_json::Error),
}

impl CloudError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }

    /// Convert into the port-level [`ApiError`].
    #[must_use]
    pub fn into_api(self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::NotAuthorized,
            Self::Timeout => ApiError::Timeout,
            Self::Status { status, body } => ApiError::Rejected { status, body },
            Self::Decode(err) => ApiError::Decode(Box::new(err)),
            other @ (Self::Build(_) | Self::Transport(_)) => ApiError::Transport(Box::new(other)),
        }
    }
}

impl From<CloudError> for ApiError {
    fn from(err: CloudError) -> Self {
        err.into_api()
    }
}

impl From<CloudError> for BridgeError {
    fn from(err: CloudError) -> Self {
        err.into_api().into_domain()
    }
}
