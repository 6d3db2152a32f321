//! Identifier newtypes used throughout item-sync
//!
//! Every id in this crate wraps a v4 UUID. Wrapping rather than passing raw
//! `Uuid` around keeps user/vault/session/item ids from being swapped at a
//! call site by accident — the compiler catches it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID (e.g. a client-chosen item uuid).
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from its canonical string form.
            pub fn from_string(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map(Self)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
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
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_newtype!(ItemUuid, "Globally unique identifier for an item, client-chosen.");
uuid_newtype!(UserUuid, "Identifier of the user that owns a sync session.");
uuid_newtype!(SharedVaultUuid, "Identifier of a shared vault scoping a set of items.");
uuid_newtype!(SessionUuid, "Identifier of the client session that made a write.");
uuid_newtype!(KeySystemIdentifier, "Identifier of the key set that encrypts an item.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(ItemUuid::new(), ItemUuid::new());
    }

    #[test]
    fn round_trips_through_string() {
        let id = UserUuid::new();
        let parsed = UserUuid::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_garbage_string() {
        assert!(ItemUuid::from_string("not-a-uuid").is_none());
    }

    #[test]
    fn distinct_id_types_do_not_compare() {
        // Compile-time guarantee: this test exists to document that
        // ItemUuid and UserUuid are distinct types, not to exercise runtime
        // behavior.
        let item = ItemUuid::new();
        let user = UserUuid::from_uuid(item.as_uuid());
        assert_eq!(item.as_uuid(), user.as_uuid());
    }
}
