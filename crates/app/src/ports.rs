//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod entity_registry;
pub mod evnex_api;
pub mod integration;
pub mod token_store;

pub use entity_registry::EntityRegistry;
pub use evnex_api::{ApiError, ChargingProfilePeriod, EvnexApi, LoadProfile};
pub use integration::{DiscoveredDevice, Integration, IntegrationContext};
pub use token_store::{TokenStore, TokenStoreError};
