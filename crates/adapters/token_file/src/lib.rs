//! # evnex-bridge-adapter-token-file
//!
//! Implements the [`TokenStore`](evnex_bridge_app::ports::TokenStore) port
//! with a JSON file mapping each configuration entry to its token triple.
//!
//! ## Dependency rule
//! Depends on `evnex-bridge-app` (for the port trait) and
//! `evnex-bridge-domain` (for [`TokenSet`](evnex_bridge_domain::token::TokenSet)).

mod error;
mod store;

pub use error::TokenFileError;
pub use store::{JsonTokenFile, TOKEN_FILE_NAME};
