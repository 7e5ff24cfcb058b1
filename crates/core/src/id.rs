//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered), so ordering by id follows creation order.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a physical site hosting machines.
    LocationId,
    "LocationId"
);
uuid_newtype!(
    /// Identifier of a vending machine.
    MachineId,
    "MachineId"
);
uuid_newtype!(ProductId, "ProductId");
uuid_newtype!(
    /// Identifier of a machine slot (a product priced and stocked in one machine).
    SlotId,
    "SlotId"
);
uuid_newtype!(SupplierId, "SupplierId");
uuid_newtype!(PurchaseId, "PurchaseId");
uuid_newtype!(ProductCostId, "ProductCostId");
uuid_newtype!(VisitId, "VisitId");
uuid_newtype!(MachineRestockId, "MachineRestockId");
uuid_newtype!(RestockEntryId, "RestockEntryId");
uuid_newtype!(DemandRecordId, "DemandRecordId");
uuid_newtype!(
    /// Identity of the operator who performed a visit (opaque to this system).
    UserId,
    "UserId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_display() {
        let id = MachineId::new();
        let parsed: MachineId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<VisitId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(msg) if msg.starts_with("VisitId")));
    }

    #[test]
    fn ids_are_time_ordered() {
        let a = ProductId::new();
        let b = ProductId::new();
        assert!(a < b);
    }
}
