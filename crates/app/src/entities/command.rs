//! Vendor commands issued by mutating entities.

use tracing::info;

use crate::ports::{ApiError, EvnexApi, LoadProfile};

/// A state change requested through a service call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetChargeNow {
        charger_id: String,
        charge_now: bool,
    },
    SetConnectorAvailability {
        org_id: String,
        charger_id: String,
        connector_id: String,
        enabled: bool,
    },
    SetMaxCurrent {
        charger_id: String,
        amps: f64,
    },
    StopSession {
        charger_id: String,
        org_id: String,
    },
}

/// Run a command against the vendor API. Never retries.
///
/// # Errors
///
/// Returns the [`ApiError`] of the underlying call.
pub async fn execute<A: EvnexApi>(api: &A, command: &Command) -> Result<(), ApiError> {
    match command {
        Command::SetChargeNow {
            charger_id,
            charge_now,
        } => {
            info!(charger = %charger_id, charge_now, "Setting charge override");
            api.set_charge_point_override(charger_id, *charge_now).await
        }
        Command::SetConnectorAvailability {
            org_id,
            charger_id,
            connector_id,
            enabled,
        } => {
            info!(charger = %charger_id, connector = %connector_id, enabled, "Changing connector availability");
            if *enabled {
                api.enable_connector(org_id, charger_id, connector_id).await
            } else {
                api.disable_connector(org_id, charger_id, connector_id).await
            }
        }
        Command::SetMaxCurrent { charger_id, amps } => {
            info!(charger = %charger_id, amps, "Setting maximum current");
            api.set_charger_load_profile(charger_id, &LoadProfile::max_current(*amps))
                .await
        }
        Command::StopSession { charger_id, org_id } => {
            info!(charger = %charger_id, "Stopping charge session");
            api.stop_charge_point(charger_id, org_id).await
        }
    }
}
