//! The item data model.
//!
//! [`Item`] is the unit of sync. [`ItemHash`] is the client-upload shape —
//! a diff the client proposes against the stored item. [`ItemConflict`] is
//! what the service reports back when a hash cannot be applied as-is.

use crate::content_type::ContentType;
use crate::ids::{ItemUuid, KeySystemIdentifier, SessionUuid, SharedVaultUuid, UserUuid};
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// The unit of sync: a client-held opaque encrypted record.
///
/// Field-level invariants. Notably:
/// - `(user_uuid, uuid)` is unique; `uuid` alone is globally unique.
/// - A tombstoned item (`deleted = true`) has `content = None`,
///   `content_size = 0`, and all crypto envelope fields cleared.
/// - `updated_at_timestamp >= created_at_timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Globally unique, client-chosen identifier.
    pub uuid: ItemUuid,
    /// Owning user.
    pub user_uuid: UserUuid,
    /// Vault this item lives in, if shared. Absent means user-private.
    pub shared_vault_uuid: Option<SharedVaultUuid>,
    /// Which key set encrypts this item, if known.
    pub key_system_identifier: Option<KeySystemIdentifier>,
    /// Opaque ciphertext. `None` when `deleted`.
    pub content: Option<Vec<u8>>,
    /// Classification of the content (`Note`, `File`, `ItemsKey` are
    /// behaviorally significant).
    pub content_type: ContentType,
    /// Byte length of the canonical server-side serialization of this
    /// item's content-bearing fields. Recomputed on every write.
    pub content_size: u64,
    /// Opaque crypto envelope field.
    pub enc_item_key: Option<String>,
    /// Opaque crypto envelope field.
    pub auth_hash: Option<String>,
    /// Opaque crypto envelope field.
    pub items_key_id: Option<String>,
    /// Tombstone flag.
    pub deleted: bool,
    /// Uuid of the item this one was forked from, if any.
    pub duplicate_of: Option<ItemUuid>,
    /// User that last wrote this item.
    pub last_edited_by_uuid: Option<UserUuid>,
    /// Session that performed the last write.
    pub updated_with_session: Option<SessionUuid>,
    /// When this item was first created.
    pub created_at_timestamp: Timestamp,
    /// The sync ordering key. Strictly increases on every mutation.
    pub updated_at_timestamp: Timestamp,
}

impl Item {
    /// Recompute `content_size` from the current content-bearing fields.
    /// Called on every write; tombstones always report a size of zero.
    pub fn recompute_content_size(&mut self) {
        self.content_size = if self.deleted {
            0
        } else {
            canonical_encoding_size(self)
        };
    }

    /// Apply the tombstone-clearing rule: a deleted item has no content,
    /// zero size, and no crypto envelope.
    pub fn clear_for_tombstone(&mut self) {
        self.deleted = true;
        self.content = None;
        self.content_size = 0;
        self.enc_item_key = None;
        self.auth_hash = None;
        self.items_key_id = None;
    }

    /// Equality used by the transition runner (C6) to decide whether a
    /// target-side item can be left alone during copy/verify.
    ///
    /// Deliberately excludes `uuid`, `user_uuid`, `created_at_timestamp`,
    /// and provenance fields (`last_edited_by_uuid`,
    /// `updated_with_session`) — those are not expected to diverge between
    /// stores holding the same logical item and are not load-bearing for
    /// "did this item change" comparisons.
    pub fn is_identical_to(&self, other: &Item) -> bool {
        self.content == other.content
            && self.content_type == other.content_type
            && self.deleted == other.deleted
            && self.enc_item_key == other.enc_item_key
            && self.auth_hash == other.auth_hash
            && self.items_key_id == other.items_key_id
            && self.duplicate_of == other.duplicate_of
            && self.shared_vault_uuid == other.shared_vault_uuid
            && self.key_system_identifier == other.key_system_identifier
            && self.updated_at_timestamp == other.updated_at_timestamp
    }
}

/// The byte-length of the canonical server-side serialization of an item's
/// content-bearing fields, used for `content_size` and for the transfer
/// budget.
fn canonical_encoding_size(item: &Item) -> u64 {
    #[derive(Serialize)]
    struct Canonical<'a> {
        content: &'a Option<Vec<u8>>,
        content_type: &'a ContentType,
        enc_item_key: &'a Option<String>,
        auth_hash: &'a Option<String>,
        items_key_id: &'a Option<String>,
    }

    let canonical = Canonical {
        content: &item.content,
        content_type: &item.content_type,
        enc_item_key: &item.enc_item_key,
        auth_hash: &item.auth_hash,
        items_key_id: &item.items_key_id,
    };

    bincode::serialized_size(&canonical).unwrap_or(0)
}

/// The client-upload shape: a proposed diff against the stored item. Every
/// field except `uuid` is optional; omission means "do not change this
/// field".
///
/// `shared_vault_uuid` uses `Option<Option<_>>` because the save operation
/// classification must distinguish three states: omitted (leave the
/// current vault scoping alone), explicitly
/// `Some(None)` (move the item out of any vault), and `Some(Some(v))`
/// (move the item into vault `v`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemHash {
    /// Identifies which item this hash applies to (or creates).
    pub uuid: ItemUuid,
    /// `Some(None)` clears vault scoping, `Some(Some(v))` sets it, `None`
    /// leaves it unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_vault_uuid: Option<Option<SharedVaultUuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_system_identifier: Option<KeySystemIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc_item_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<ItemUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by_uuid: Option<UserUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_with_session: Option<SessionUuid>,
    /// If supplied on a create, the server honors it instead of stamping
    /// the clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_timestamp: Option<Timestamp>,
    /// Clients echo back the `updated_at_timestamp` they last observed so
    /// the save validator can detect a stale write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_timestamp: Option<Timestamp>,
}

impl ItemHash {
    /// Build the minimal hash needed to create or touch an item by uuid,
    /// useful in tests and for programmatic construction.
    pub fn new(uuid: ItemUuid) -> Self {
        Self {
            uuid,
            shared_vault_uuid: None,
            key_system_identifier: None,
            content: None,
            content_type: None,
            enc_item_key: None,
            auth_hash: None,
            items_key_id: None,
            deleted: None,
            duplicate_of: None,
            last_edited_by_uuid: None,
            updated_with_session: None,
            created_at_timestamp: None,
            updated_at_timestamp: None,
        }
    }
}

/// The classification of why an item hash could not be applied directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A create failed because the uuid already exists under a different
    /// owner, or collided in the repository.
    UuidConflict,
    /// The stored item's `updated_at_timestamp` differs from the hash's by
    /// more than the configured tolerance: this write is based on a stale
    /// read.
    SyncConflict,
    /// The write targets an immutable or forbidden content type.
    ContentTypeError,
    /// The session has read-only access.
    ReadOnlyError,
    /// The write touches `shared_vault_uuid` but the writer lacks write
    /// permission or membership.
    SharedVaultPermissionError,
}

/// A single item that could not be saved as proposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConflict {
    /// The hash the client tried to apply.
    pub unsaved_item: ItemHash,
    /// The server's current version of the item, if one exists.
    pub server_item: Option<Item>,
    /// Why the save was rejected.
    #[serde(rename = "type")]
    pub kind: ConflictKind,
}
