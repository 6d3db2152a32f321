//! The item repository contract (C5) and an in-memory reference
//! implementation.

use crate::query::{Comparator, ItemQuery, SortDirection, SortKey};
use dashmap::DashMap;
use itemsync_core::{Error, Item, ItemUuid, Result, UserUuid};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered, paginated, durable storage of items, scoped by user and vault.
///
/// Implementations must provide read-after-write consistency within a
/// single user: a `find_by_uuid`/`find_all` call observes every `save`
/// that returned before it was issued.
pub trait ItemRepository: Send + Sync {
    /// Look up a single item by uuid, scoped to its owning user.
    fn find_by_uuid(&self, user_uuid: UserUuid, uuid: ItemUuid) -> Result<Option<Item>>;

    /// Run a filtered, ordered, paginated query.
    fn find_all(&self, query: &ItemQuery) -> Result<Vec<Item>>;

    /// Count rows matching `query`, ignoring `offset`/`limit`/`uuids`.
    fn count_all(&self, query: &ItemQuery) -> Result<usize>;

    /// Upsert an item by uuid. Returns the persisted entity.
    ///
    /// Returns [`Error::ConflictingItem`] if the uuid already exists under
    /// a different owner.
    fn save(&self, item: Item) -> Result<Item>;

    /// Remove a single item permanently, scoped to its owning user.
    fn remove_by_uuid(&self, user_uuid: UserUuid, uuid: ItemUuid) -> Result<()>;

    /// Bulk-delete a user's private items (not in any shared vault). Used
    /// only by the transition runner's cleanup phase.
    fn delete_by_user_uuid_and_not_in_shared_vault(&self, user_uuid: UserUuid) -> Result<usize>;
}

/// Per-user map of items, guarded by a single lock so a `save` and the
/// `find_*` calls that follow it observe each other in order.
#[derive(Default)]
struct UserItems {
    items: HashMap<ItemUuid, Item>,
}

/// In-memory [`ItemRepository`], suitable for tests and as a reference
/// implementation of the contract. A uuid-to-owner index (`owners`) is
/// kept outside the per-user locks so a cross-user uuid collision can be
/// detected without locking every user's map.
pub struct InMemoryItemRepository {
    users: DashMap<UserUuid, Arc<Mutex<UserItems>>>,
    owners: DashMap<ItemUuid, UserUuid>,
}

impl InMemoryItemRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            owners: DashMap::new(),
        }
    }

    fn user_items(&self, user_uuid: UserUuid) -> Arc<Mutex<UserItems>> {
        self.users
            .entry(user_uuid)
            .or_insert_with(|| Arc::new(Mutex::new(UserItems::default())))
            .clone()
    }

    fn matches(query: &ItemQuery, item: &Item) -> bool {
        if item.user_uuid != query.user_uuid {
            return false;
        }

        if query.vault_scope.all_vaults {
            // no vault filtering at all
        } else if !query.vault_scope.exclusive_shared_vault_uuids.is_empty() {
            let in_scope = item
                .shared_vault_uuid
                .map(|v| query.vault_scope.exclusive_shared_vault_uuids.contains(&v))
                .unwrap_or(false);
            if !in_scope {
                return false;
            }
        } else if !query.vault_scope.include_shared_vault_uuids.is_empty() {
            let in_scope = match item.shared_vault_uuid {
                None => true,
                Some(v) => query.vault_scope.include_shared_vault_uuids.contains(&v),
            };
            if !in_scope {
                return false;
            }
        } else if item.shared_vault_uuid.is_some() {
            // No vaults requested: private items only.
            return false;
        }

        if let Some(content_type) = &query.content_type {
            if &item.content_type != content_type {
                return false;
            }
        }

        if let Some(deleted) = query.deleted {
            if item.deleted != deleted {
                return false;
            }
        }

        if let Some(uuids) = &query.uuids {
            if !uuids.contains(&item.uuid) {
                return false;
            }
        }

        if let Some(last_sync_time) = query.last_sync_time {
            if !query.comparator.matches(item.updated_at_timestamp, last_sync_time) {
                return false;
            }
        }

        true
    }

    fn sort_key(item: &Item, key: SortKey) -> itemsync_core::Timestamp {
        match key {
            SortKey::CreatedAt => item.created_at_timestamp,
            SortKey::UpdatedAt => item.updated_at_timestamp,
        }
    }
}

impl Default for InMemoryItemRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemRepository for InMemoryItemRepository {
    fn find_by_uuid(&self, user_uuid: UserUuid, uuid: ItemUuid) -> Result<Option<Item>> {
        let bucket = self.user_items(user_uuid);
        let guard = bucket.lock();
        Ok(guard.items.get(&uuid).cloned())
    }

    fn find_all(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let bucket = self.user_items(query.user_uuid);
        let guard = bucket.lock();

        let mut matched: Vec<Item> = guard
            .items
            .values()
            .filter(|item| Self::matches(query, item))
            .cloned()
            .collect();
        drop(guard);

        matched.sort_by(|a, b| {
            let by_time = Self::sort_key(a, query.sort_key).cmp(&Self::sort_key(b, query.sort_key));
            let by_time = match query.sort_direction {
                SortDirection::Ascending => by_time,
                SortDirection::Descending => by_time.reverse(),
            };
            by_time.then_with(|| a.uuid.as_uuid().cmp(&b.uuid.as_uuid()))
        });

        let start = query.offset.min(matched.len());
        let end = matched.len().min(start.saturating_add(query.limit));
        Ok(matched[start..end].to_vec())
    }

    fn count_all(&self, query: &ItemQuery) -> Result<usize> {
        let bucket = self.user_items(query.user_uuid);
        let guard = bucket.lock();
        Ok(guard.items.values().filter(|item| Self::matches(query, item)).count())
    }

    fn save(&self, item: Item) -> Result<Item> {
        if let Some(owner) = self.owners.get(&item.uuid) {
            if *owner != item.user_uuid {
                tracing::warn!(uuid = %item.uuid, "rejecting save: uuid owned by a different user");
                return Err(Error::ConflictingItem(format!(
                    "uuid {} already owned by a different user",
                    item.uuid
                )));
            }
        }

        let bucket = self.user_items(item.user_uuid);
        let mut guard = bucket.lock();
        guard.items.insert(item.uuid, item.clone());
        drop(guard);

        self.owners.insert(item.uuid, item.user_uuid);
        Ok(item)
    }

    fn remove_by_uuid(&self, user_uuid: UserUuid, uuid: ItemUuid) -> Result<()> {
        let bucket = self.user_items(user_uuid);
        let mut guard = bucket.lock();
        guard.items.remove(&uuid);
        drop(guard);
        self.owners.remove(&uuid);
        Ok(())
    }

    fn delete_by_user_uuid_and_not_in_shared_vault(&self, user_uuid: UserUuid) -> Result<usize> {
        let bucket = self.user_items(user_uuid);
        let mut guard = bucket.lock();
        let to_remove: Vec<ItemUuid> = guard
            .items
            .values()
            .filter(|item| item.shared_vault_uuid.is_none())
            .map(|item| item.uuid)
            .collect();
        for uuid in &to_remove {
            guard.items.remove(uuid);
        }
        drop(guard);
        for uuid in &to_remove {
            self.owners.remove(uuid);
        }
        Ok(to_remove.len())
    }
}
