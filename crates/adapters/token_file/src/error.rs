//! Token file error types.

use std::path::PathBuf;

use evnex_bridge_app::ports::TokenStoreError;

/// Errors specific to the token file adapter.
#[derive(Debug, thiserror::Error)]
pub enum TokenFileError {
    /// The file or its temporary sibling could not be written.
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token map could not be serialized.
    #[error("failed to encode token map")]
    Encode(#[source] serde_json::Error),
}

impl From<TokenFileError> for TokenStoreError {
    fn from(err: TokenFileError) -> Self {
        TokenStoreError(Box::new(err))
    }
}
