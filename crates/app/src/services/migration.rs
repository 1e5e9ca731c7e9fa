//! One-time rewrite of legacy entity unique ids.

use evnex_bridge_domain::error::BridgeError;
use evnex_bridge_domain::migration::{SCHEMA_VERSION, migrate_unique_id};
use tracing::{info, warn};

use crate::ports::EntityRegistry;

/// What a migration pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// `(old, new)` unique ids of the renamed entities.
    pub renamed: Vec<(String, String)>,
    /// Legacy unique ids left alone because their new id was already taken.
    pub skipped: Vec<String>,
}

/// Rename every legacy unique id owned by `integration`, then record the
/// current schema version so the pass runs only once.
///
/// # Errors
///
/// Returns the registry's [`BridgeError`] if reading or renaming fails.
pub async fn migrate_entities<R: EntityRegistry>(
    registry: &R,
    integration: &str,
) -> Result<MigrationReport, BridgeError> {
    let mut report = MigrationReport::default();
    let version = registry.schema_version(integration).await?;
    if version >= SCHEMA_VERSION {
        return Ok(report);
    }

    info!(from = version, to = SCHEMA_VERSION, "Migrating entity unique ids");
    for entity in registry.entities_of(integration).await? {
        let Some(new_id) = migrate_unique_id(entity.kind, &entity.unique_id) else {
            continue;
        };
        if registry
            .find_by_unique_id(integration, &new_id)
            .await?
            .is_some()
        {
            warn!(
                entity_id = %entity.entity_id,
                old = %entity.unique_id,
                new = %new_id,
                "Skipping unique id migration, new id is already registered"
            );
            report.skipped.push(entity.unique_id);
            continue;
        }
        info!(entity_id = %entity.entity_id, old = %entity.unique_id, new = %new_id, "Renaming unique id");
        registry.rename_unique_id(entity.id, new_id.clone()).await?;
        report.renamed.push((entity.unique_id, new_id));
    }

    registry
        .set_schema_version(integration, SCHEMA_VERSION)
        .await?;
    Ok(report)
}
