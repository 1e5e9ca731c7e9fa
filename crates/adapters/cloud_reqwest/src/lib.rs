//! # evnex-bridge-adapter-cloud
//!
//! Evnex cloud adapter: implements the [`EvnexApi`](evnex_bridge_app::ports::EvnexApi)
//! port against the vendor's HTTPS API with `reqwest`.
//!
//! ## Responsibilities
//! - Authenticate through Cognito (`USER_PASSWORD_AUTH`, `REFRESH_TOKEN_AUTH`)
//! - Send the raw access token on every API call
//! - Unwrap the vendor's `{ "data": ... }` envelopes into domain records
//! - Map HTTP failures onto [`ApiError`](evnex_bridge_app::ports::ApiError)
//!
//! ## Dependency rule
//! Depends on `evnex-bridge-app` (for the port trait) and
//! `evnex-bridge-domain` (for the records). Never imported by the app layer.

mod client;
mod config;
mod error;
mod wire;

pub use client::{Credentials, EvnexClient};
pub use config::CloudConfig;
pub use error::CloudError;
