//! Entity registry port: read and rename access to registered entities.
//!
//! Used by the one-time unique id migration, which needs to list what is
//! already registered and to know which schema version was last applied.

use std::future::Future;

use evnex_bridge_domain::entity::Entity;
use evnex_bridge_domain::error::BridgeError;
use evnex_bridge_domain::id::EntityId;

pub trait EntityRegistry: Send + Sync {
    /// Every entity owned by `integration`.
    fn entities_of(
        &self,
        integration: &str,
    ) -> impl Future<Output = Result<Vec<Entity>, BridgeError>> + Send;

    /// Look up an entity by its integration-owned unique id.
    fn find_by_unique_id(
        &self,
        integration: &str,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<Entity>, BridgeError>> + Send;

    /// Change the unique id of a registered entity, keeping its [`EntityId`].
    fn rename_unique_id(
        &self,
        id: EntityId,
        unique_id: String,
    ) -> impl Future<Output = Result<Entity, BridgeError>> + Send;

    /// Last schema version applied for `integration` (0 when never migrated).
    fn schema_version(
        &self,
        integration: &str,
    ) -> impl Future<Output = Result<u32, BridgeError>> + Send;

    fn set_schema_version(
        &self,
        integration: &str,
        version: u32,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}
