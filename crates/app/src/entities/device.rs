//! Device identity: which host device an entity scope belongs to.

use evnex_bridge_domain::device::Device;
use evnex_bridge_domain::error::{BridgeError, NotFoundError};
use evnex_bridge_domain::snapshot::Snapshot;

use super::{INTEGRATION, Scope};

const MANUFACTURER: &str = "evnex";
const CONFIGURATION_URL: &str = "https://evnex.io";

/// Capability of resolving the device that owns an entity.
pub trait DeviceIdentity {
    /// Vendor id of the owning organisation or charger.
    fn device_unique_id(&self) -> &str;

    /// Build the owning device from the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when the owner is not in the snapshot.
    fn device(&self, snapshot: &Snapshot) -> Result<Device, BridgeError>;
}

impl DeviceIdentity for Scope {
    fn device_unique_id(&self) -> &str {
        self.charger_id().unwrap_or_else(|| self.org_id())
    }

    fn device(&self, snapshot: &Snapshot) -> Result<Device, BridgeError> {
        let builder = Device::builder()
            .manufacturer(MANUFACTURER)
            .configuration_url(CONFIGURATION_URL)
            .integration(INTEGRATION)
            .unique_id(self.device_unique_id());
        match self.charger_id() {
            None => {
                let org = snapshot
                    .org_briefs
                    .get(self.org_id())
                    .ok_or_else(|| not_found("Organisation", self.org_id()))?;
                builder.name(&org.name).build()
            }
            Some(charger_id) => {
                let cp = snapshot
                    .charge_points
                    .get(charger_id)
                    .ok_or_else(|| not_found("ChargePoint", charger_id))?;
                builder
                    .name(&cp.name)
                    .model(cp.details.model.clone())
                    .sw_version(cp.details.firmware.clone())
                    .hw_version(cp.serial.clone())
                    .build()
            }
        }
    }
}

fn not_found(entity: &'static str, id: &str) -> BridgeError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CP_ONLINE, ORG, sample_snapshot};

    #[test]
    fn should_describe_charger_from_listing() {
        let scope = Scope::Connector {
            org_id: ORG.to_string(),
            charger_id: CP_ONLINE.to_string(),
            connector_id: "1".to_string(),
        };
        let device = scope.device(&sample_snapshot()).unwrap();

        assert_eq!(device.unique_id, CP_ONLINE);
        assert_eq!(device.name, "Garage");
        assert_eq!(device.model.as_deref(), Some("E7 Plus"));
        assert_eq!(device.sw_version.as_deref(), Some("2.1.0"));
        assert_eq!(device.hw_version.as_deref(), Some("SN-GARAGE"));
    }

    #[test]
    fn should_describe_org_with_configuration_url() {
        let scope = Scope::Org {
            org_id: ORG.to_string(),
        };
        let device = scope.device(&sample_snapshot()).unwrap();

        assert_eq!(device.name, "Home");
        assert_eq!(device.manufacturer.as_deref(), Some("evnex"));
        assert_eq!(device.configuration_url.as_deref(), Some("https://evnex.io"));
    }

    #[test]
    fn should_fail_for_unknown_org() {
        let scope = Scope::Org {
            org_id: "nope".to_string(),
        };
        assert!(matches!(
            scope.device(&sample_snapshot()),
            Err(BridgeError::NotFound(_))
        ));
    }
}
