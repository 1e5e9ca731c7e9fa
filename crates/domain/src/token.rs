//! Cognito token triple kept between restarts.

use serde::{Deserialize, Serialize};

/// Session tokens issued by the vendor's identity provider.
///
/// Every field is optional: a freshly configured entry has none, and the
/// provider does not always return a new refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
}

impl TokenSet {
    /// Whether no token at all is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_token.is_none() && self.refresh_token.is_none() && self.access_token.is_none()
    }
}
