//! Registry identifiers.
//!
//! The host registry hands out UUIDs. A record first seen under
//! `(integration, unique_id)` gets a name-based (v5) UUID, so a registry
//! rebuilt from scratch assigns the same ids again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Namespace of every name-based id minted by the bridge.
const NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6a1c_5e0b_93d4_4f0e_b1a7_2c8e_4d37_f915);

macro_rules! registry_id {
    ($(#[doc = $doc:expr])* $name:ident, $tag:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Random id, for records the registry did not mint.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Stable id of the record `unique_id` owned by `integration`.
            #[must_use]
            pub fn derived(integration: &str, unique_id: &str) -> Self {
                let name = format!("{}:{integration}:{unique_id}", $tag);
                Self(uuid::Uuid::new_v5(&NAMESPACE, name.as_bytes()))
            }

            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

registry_id!(
    /// Registry id of an [`Entity`](crate::entity::Entity).
    EntityId,
    "entity"
);

registry_id!(
    /// Registry id of a [`Device`](crate::device::Device).
    DeviceId,
    "device"
);
