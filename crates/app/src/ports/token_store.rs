//! Token store port: persisted session tokens, keyed by configuration entry.

use evnex_bridge_domain::error::BoxError;
use evnex_bridge_domain::token::TokenSet;

/// Failure to persist tokens. Reads never fail: unreadable data is absent data.
#[derive(Debug, thiserror::Error)]
#[error("failed to persist session tokens")]
pub struct TokenStoreError(#[source] pub BoxError);

/// Storage for token triples.
///
/// The store is a small local file, so the calls are synchronous.
pub trait TokenStore: Send + Sync {
    /// Tokens saved for `key`, or `None` when absent or unreadable.
    fn load(&self, key: &str) -> Option<TokenSet>;

    /// Replace the tokens saved for `key`, keeping every other key.
    ///
    /// # Errors
    ///
    /// Returns [`TokenStoreError`] when the backing storage cannot be written.
    fn save(&self, key: &str, tokens: &TokenSet) -> Result<(), TokenStoreError>;
}
