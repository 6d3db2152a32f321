//! The shared-vault membership collaborator.

use itemsync_core::{Result, SharedVaultUuid, UserUuid};
use std::collections::HashMap;
use std::sync::RwLock;

/// A user's membership record in one shared vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedVaultUser {
    /// The vault.
    pub shared_vault_uuid: SharedVaultUuid,
    /// The member.
    pub user_uuid: UserUuid,
    /// True if the member may write items into this vault.
    pub has_write_access: bool,
}

/// Read-only lookups into shared-vault membership. The item service uses
/// this to compute effective vault scope on reads and to check write
/// permission on saves.
pub trait SharedVaultUserRepository: Send + Sync {
    /// All vault memberships for a user.
    fn find_all_for_user(&self, user_uuid: UserUuid) -> Result<Vec<SharedVaultUser>>;
}

/// In-memory membership table.
#[derive(Default)]
pub struct InMemorySharedVaultUserRepository {
    memberships: RwLock<HashMap<UserUuid, Vec<SharedVaultUser>>>,
}

impl InMemorySharedVaultUserRepository {
    /// Construct an empty membership table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a membership, replacing any prior record for the same
    /// `(user_uuid, shared_vault_uuid)` pair.
    pub fn add_membership(&self, membership: SharedVaultUser) {
        let mut table = self.memberships.write().unwrap();
        let entries = table.entry(membership.user_uuid).or_default();
        entries.retain(|m| m.shared_vault_uuid != membership.shared_vault_uuid);
        entries.push(membership);
    }

    /// Remove a user's membership in a vault, if any.
    pub fn remove_membership(&self, user_uuid: UserUuid, shared_vault_uuid: SharedVaultUuid) {
        let mut table = self.memberships.write().unwrap();
        if let Some(entries) = table.get_mut(&user_uuid) {
            entries.retain(|m| m.shared_vault_uuid != shared_vault_uuid);
        }
    }
}

impl SharedVaultUserRepository for InMemorySharedVaultUserRepository {
    fn find_all_for_user(&self, user_uuid: UserUuid) -> Result<Vec<SharedVaultUser>> {
        let table = self.memberships.read().unwrap();
        Ok(table.get(&user_uuid).cloned().unwrap_or_default())
    }
}
