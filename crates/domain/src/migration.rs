//! Versioned unique id migration.
//!
//! Older releases built unique ids from a class name or a connector-less
//! key. [`migrate_unique_id`] rewrites such a legacy id to the current
//! `<vendor-uuid><key>` form, or returns `None` when there is nothing to do.

use crate::entity::EntityKind;

/// Schema version reached once every rename of this module has been applied.
pub const SCHEMA_VERSION: u32 = 2;

/// Length of a hyphenated UUID, the prefix of every unique id.
const UUID_LEN: usize = 36;

const SENSOR_RENAMES: &[(&str, &str)] = &[
    ("EvnexOrgWidePowerUsageSensorToday", "org_wide_power_usage_today"),
    ("EvnexOrgWideChargeSessionsCountSensor", "org_wide_charger_sessions_today"),
    ("EvnexOrgTierSensor", "org_tier"),
    ("EvnexChargerNetworkStatusSensor", "charger_network_status"),
    ("EvnexChargerSessionEnergy", "session_energy"),
    ("EvnexChargerSessionCost", "session_cost"),
    ("EvnexChargerSessionTime", "session_time"),
    ("EvnexChargerLastSessionStartTime", "session_start_time"),
    ("EvnexChargerSessionHistorySensor", "charger_session_history"),
    ("network_status", "charger_network_status"),
    ("session_history", "charger_session_history"),
    ("sessions_today", "org_wide_charger_sessions_today"),
    ("power_usage_today", "org_wide_power_usage_today"),
    ("connector_status", "connector_1_status"),
    ("connector_voltage", "connector_1_voltage"),
    ("connector_current", "connector_1_current"),
    ("connector_power", "connector_1_power"),
    ("connector_frequency", "connector_1_frequency"),
];

const SWITCH_RENAMES: &[(&str, &str)] = &[
    ("EvnexChargerOverrideSwitch", "charger_charge_now_switch"),
    ("charge_now", "charger_charge_now_switch"),
];

const NUMBER_RENAMES: &[(&str, &str)] = &[
    ("EvnexNumber", "connector_1_maximum_current"),
    ("max_current", "connector_1_maximum_current"),
];

fn renames(kind: EntityKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        EntityKind::Sensor => SENSOR_RENAMES,
        EntityKind::Switch => SWITCH_RENAMES,
        EntityKind::Number => NUMBER_RENAMES,
        EntityKind::Button => &[],
    }
}

/// Rewrite a legacy unique id, keyed by entity domain.
///
/// Returns `None` when `old` does not start with a UUID or its suffix is
/// not a known legacy suffix for `kind`.
#[must_use]
pub fn migrate_unique_id(kind: EntityKind, old: &str) -> Option<String> {
    let prefix = old.get(..UUID_LEN)?;
    let suffix = old.get(UUID_LEN..)?;
    uuid::Uuid::try_parse(prefix).ok()?;
    renames(kind)
        .iter()
        .find(|(legacy, _)| *legacy == suffix)
        .map(|(_, current)| format!("{prefix}{current}"))
}
