//! Item service (C4): orchestrates read-sync and write-sync, assembles
//! responses, and emits downstream events.

use crate::cancellation::CancellationToken;
use crate::config::SyncConfig;
use crate::token::{CursorToken, SyncToken};
use crate::transfer::select_within_budget;
use crate::validator::{RuleOutcome, SaveValidator, ValidationContext};
use itemsync_core::{
    Clock, ContentType, ConflictKind, Error, Item, ItemConflict, ItemHash, ItemUuid, Result,
    SessionUuid, SharedVaultUuid, Timestamp, UserUuid,
};
use itemsync_repository::{
    Comparator, DomainEvent, DomainEventPublisher, ItemQuery, ItemRepository, SharedVaultUserRepository,
    SortDirection, SortKey, UserEventService, VaultScope,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Request shape for [`ItemService::get_items`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetItemsRequest {
    /// Requesting user.
    pub user_uuid: UserUuid,
    /// Full-response boundary from a prior call. Cursor wins if both are
    /// present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<SyncToken>,
    /// Mid-pagination boundary from a prior call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_token: Option<CursorToken>,
    /// Requested page size; clamped by [`SyncConfig::effective_limit`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Restrict to a single content type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    /// Restrict to these vaults (intersected with the user's memberships).
    /// `None` means every vault the user belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_vault_uuids: Option<Vec<SharedVaultUuid>>,
}

/// Result of [`ItemService::get_items`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetItemsResult {
    /// Items delivered this page, in `updated_at_timestamp ASC` order
    /// (ties broken by uuid), with any `ItemsKey` items front-loaded on an
    /// initial sync.
    pub retrieved_items: Vec<Item>,
    /// Present when the response is complete: "deliver changes strictly
    /// after this point" on the next call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<SyncToken>,
    /// Present when more pages remain: "continue at or after this point"
    /// on the next call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_token: Option<CursorToken>,
    /// Total rows matching the query's filters, ignoring pagination.
    pub total_count: usize,
}

/// Request shape for [`ItemService::save_items`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveItemsRequest {
    /// Requesting user.
    pub user_uuid: UserUuid,
    /// Session performing the write, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_uuid: Option<SessionUuid>,
    /// Client API version, carried through for collaborators that branch
    /// on it. Opaque to this crate.
    pub api_version: String,
    /// Client SDK version, opaque to this crate.
    pub sdk_version: String,
    /// True if this session may only read.
    pub read_only_access: bool,
    /// The proposed diffs, applied in order.
    pub item_hashes: Vec<ItemHash>,
}

/// Result of [`ItemService::save_items`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveItemsResult {
    /// Items successfully created, updated, or confirmed as an idempotent
    /// resend, in request order.
    pub saved_items: Vec<Item>,
    /// Items that could not be saved as proposed, in request order.
    pub conflicts: Vec<ItemConflict>,
    /// "Deliver changes strictly after this point" on the next
    /// `get_items` call.
    pub sync_token: SyncToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOperation {
    Create,
    Update,
    AddToSharedVault,
    RemoveFromSharedVault,
    NoopInVault,
}

/// Orchestrates read-sync and write-sync over an [`ItemRepository`] and its
/// collaborators.
pub struct ItemService {
    repository: Arc<dyn ItemRepository>,
    shared_vault_users: Arc<dyn SharedVaultUserRepository>,
    user_events: Arc<dyn UserEventService>,
    publisher: Arc<dyn DomainEventPublisher>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    validator: SaveValidator,
}

impl ItemService {
    /// Wire together an item service from its collaborators.
    pub fn new(
        repository: Arc<dyn ItemRepository>,
        shared_vault_users: Arc<dyn SharedVaultUserRepository>,
        user_events: Arc<dyn UserEventService>,
        publisher: Arc<dyn DomainEventPublisher>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            repository,
            shared_vault_users,
            user_events,
            publisher,
            clock,
            config,
            validator: SaveValidator::new(),
        }
    }

    fn effective_vault_uuids(
        &self,
        user_uuid: UserUuid,
        requested: Option<&[SharedVaultUuid]>,
    ) -> Result<Vec<SharedVaultUuid>> {
        let memberships = self
            .shared_vault_users
            .find_all_for_user(user_uuid)
            .map_err(|e| Error::transient(format!("shared-vault lookup failed: {e}")))?;
        let member_vaults: Vec<SharedVaultUuid> = memberships.iter().map(|m| m.shared_vault_uuid).collect();

        Ok(match requested {
            None => member_vaults,
            Some(requested) => member_vaults
                .into_iter()
                .filter(|v| requested.contains(v))
                .collect(),
        })
    }

    /// Read changes since the client's last sync point.
    #[instrument(skip(self, request, cancellation), fields(user_uuid = %request.user_uuid))]
    pub fn get_items(
        &self,
        request: GetItemsRequest,
        cancellation: &CancellationToken,
    ) -> Result<GetItemsResult> {
        let is_initial_sync = request.sync_token.is_none() && request.cursor_token.is_none();

        let (last_sync_time, comparator) = if let Some(cursor) = &request.cursor_token {
            (Some(cursor.decode()?), Comparator::GreaterOrEqual)
        } else if let Some(sync) = &request.sync_token {
            (Some(sync.decode()?), Comparator::GreaterThan)
        } else {
            (None, Comparator::GreaterThan)
        };

        let limit = self.config.effective_limit(request.limit);
        let effective_vaults =
            self.effective_vault_uuids(request.user_uuid, request.shared_vault_uuids.as_deref())?;

        let query = ItemQuery {
            user_uuid: request.user_uuid,
            vault_scope: VaultScope {
                include_shared_vault_uuids: effective_vaults,
                ..VaultScope::default()
            },
            last_sync_time,
            comparator,
            content_type: request.content_type.clone(),
            deleted: if last_sync_time.is_some() { None } else { Some(false) },
            uuids: None,
            sort_key: SortKey::UpdatedAt,
            sort_direction: SortDirection::Ascending,
            offset: 0,
            limit,
        };

        let candidates = self.repository.find_all(&query)?;
        if cancellation.is_cancelled() {
            return Ok(GetItemsResult {
                retrieved_items: Vec::new(),
                sync_token: request.sync_token,
                cursor_token: request.cursor_token,
                total_count: 0,
            });
        }

        let stream = candidates.iter().map(|item| (item.uuid, item.content_size));
        let selected_uuids = select_within_budget(stream, self.config.content_transfer_budget);
        let truncated_by_budget = selected_uuids.len() < candidates.len();

        let mut retrieved_items: Vec<Item> = candidates
            .into_iter()
            .filter(|item| selected_uuids.contains(&item.uuid))
            .collect();

        if is_initial_sync {
            self.front_load_items_key(&query, &mut retrieved_items)?;
        }

        let total_count = self.repository.count_all(&query.without_pagination())?;

        let (sync_token, cursor_token) = if total_count > limit || truncated_by_budget {
            let boundary = match retrieved_items.last() {
                // The transfer budget, not the page limit, cut this page
                // short: candidates beyond the delivered prefix are still
                // sitting at or before the last-delivered timestamp, so a
                // `>=` continuation on that timestamp would just re-select
                // the same prefix forever. Advance strictly past it instead,
                // guaranteeing the next call makes forward progress.
                Some(item) if truncated_by_budget => item.updated_at_timestamp.plus_one_micro(),
                Some(item) => item.updated_at_timestamp,
                None => last_sync_time.unwrap_or_else(|| self.clock.tick()),
            };
            (None, Some(CursorToken::encode(boundary)))
        } else {
            let boundary = match retrieved_items.iter().map(|i| i.updated_at_timestamp).max() {
                Some(max) => max.plus_one_micro(),
                None => last_sync_time.unwrap_or_else(|| self.clock.tick()),
            };
            (Some(SyncToken::encode(boundary)), None)
        };

        Ok(GetItemsResult {
            retrieved_items,
            sync_token,
            cursor_token,
            total_count,
        })
    }

    fn front_load_items_key(&self, base_query: &ItemQuery, retrieved: &mut Vec<Item>) -> Result<()> {
        let mut key_query = base_query.clone();
        key_query.content_type = Some(ContentType::ItemsKey);
        key_query.last_sync_time = None;
        key_query.deleted = Some(false);
        key_query.offset = 0;
        key_query.limit = usize::MAX;

        let keys = self.repository.find_all(&key_query)?;
        let already_present: Vec<ItemUuid> = retrieved.iter().map(|i| i.uuid).collect();
        let mut missing: Vec<Item> = keys
            .into_iter()
            .filter(|k| !already_present.contains(&k.uuid))
            .collect();
        missing.append(retrieved);
        *retrieved = missing;
        Ok(())
    }

    /// Apply a batch of client-proposed item diffs.
    #[instrument(skip(self, request, cancellation), fields(user_uuid = %request.user_uuid, batch_size = request.item_hashes.len()))]
    pub fn save_items(
        &self,
        request: SaveItemsRequest,
        cancellation: &CancellationToken,
    ) -> Result<SaveItemsResult> {
        let request_start = self.clock.tick();
        let memberships = self
            .shared_vault_users
            .find_all_for_user(request.user_uuid)
            .map_err(|e| Error::transient(format!("shared-vault lookup failed: {e}")))?;

        let mut saved_items = Vec::new();
        let mut conflicts = Vec::new();

        for hash in request.item_hashes {
            if cancellation.is_cancelled() {
                break;
            }

            let existing = self.repository.find_by_uuid(request.user_uuid, hash.uuid)?;

            if request.read_only_access {
                conflicts.push(ItemConflict {
                    unsaved_item: hash,
                    server_item: existing,
                    kind: ConflictKind::ReadOnlyError,
                });
                continue;
            }

            let ctx = ValidationContext {
                hash: &hash,
                existing_item: existing.as_ref(),
                vault_memberships: &memberships,
                config: &self.config,
            };

            match self.validator.validate(&ctx) {
                RuleOutcome::Conflict(kind) => {
                    conflicts.push(ItemConflict {
                        unsaved_item: hash,
                        server_item: existing,
                        kind,
                    });
                    continue;
                }
                RuleOutcome::Skip(item) => {
                    saved_items.push(item);
                    continue;
                }
                RuleOutcome::Pass => {}
            }

            match self.apply_hash(request.user_uuid, request.session_uuid, hash.clone(), existing) {
                Ok(item) => saved_items.push(item),
                Err(Error::ConflictingItem(_)) => {
                    conflicts.push(ItemConflict {
                        unsaved_item: hash,
                        server_item: None,
                        kind: ConflictKind::UuidConflict,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let boundary = saved_items
            .iter()
            .map(|i| i.updated_at_timestamp)
            .chain(std::iter::once(request_start))
            .max()
            .unwrap_or(request_start)
            .plus_one_micro();

        Ok(SaveItemsResult {
            saved_items,
            conflicts,
            sync_token: SyncToken::encode(boundary),
        })
    }

    fn apply_hash(
        &self,
        user_uuid: UserUuid,
        session_uuid: Option<SessionUuid>,
        hash: ItemHash,
        existing: Option<Item>,
    ) -> Result<Item> {
        match existing {
            None => self.create_item(user_uuid, session_uuid, hash),
            Some(existing) => self.update_item(existing, hash),
        }
    }

    fn create_item(&self, user_uuid: UserUuid, session_uuid: Option<SessionUuid>, hash: ItemHash) -> Result<Item> {
        let created_at = hash.created_at_timestamp.unwrap_or_else(|| self.clock.tick());
        let updated_at = self.clock.tick().max(created_at);
        let resolved_vault = hash.shared_vault_uuid.flatten();

        let mut item = Item {
            uuid: hash.uuid,
            user_uuid,
            shared_vault_uuid: resolved_vault,
            key_system_identifier: hash.key_system_identifier,
            content: hash.content,
            content_type: hash.content_type.unwrap_or(ContentType::Other(String::new())),
            content_size: 0,
            enc_item_key: hash.enc_item_key,
            auth_hash: hash.auth_hash,
            items_key_id: hash.items_key_id,
            deleted: hash.deleted.unwrap_or(false),
            duplicate_of: hash.duplicate_of,
            last_edited_by_uuid: hash.last_edited_by_uuid,
            updated_with_session: hash.updated_with_session.or(session_uuid),
            created_at_timestamp: created_at,
            updated_at_timestamp: updated_at,
        };

        if item.deleted {
            item.clear_for_tombstone();
        } else {
            item.recompute_content_size();
        }

        let persisted = self.repository.save(item)?;

        let save_operation = SaveOperation::Create;
        self.emit_events(save_operation, None, &persisted, persisted.duplicate_of.is_some());

        Ok(persisted)
    }

    fn update_item(&self, existing: Item, hash: ItemHash) -> Result<Item> {
        let had_vault = existing.shared_vault_uuid;
        let mut item = existing.clone();

        if let Some(vault) = hash.shared_vault_uuid {
            item.shared_vault_uuid = vault;
        }
        if let Some(key_system_identifier) = hash.key_system_identifier {
            item.key_system_identifier = Some(key_system_identifier);
        }
        if let Some(content) = hash.content {
            item.content = Some(content);
        }
        if let Some(content_type) = hash.content_type {
            item.content_type = content_type;
        }
        if let Some(enc_item_key) = hash.enc_item_key {
            item.enc_item_key = Some(enc_item_key);
        }
        if let Some(auth_hash) = hash.auth_hash {
            item.auth_hash = Some(auth_hash);
        }
        if let Some(items_key_id) = hash.items_key_id {
            item.items_key_id = Some(items_key_id);
        }
        if let Some(duplicate_of) = hash.duplicate_of {
            item.duplicate_of = Some(duplicate_of);
        }
        if let Some(last_edited_by_uuid) = hash.last_edited_by_uuid {
            item.last_edited_by_uuid = Some(last_edited_by_uuid);
        }
        if let Some(updated_with_session) = hash.updated_with_session {
            item.updated_with_session = Some(updated_with_session);
        }

        let was_marked_as_duplicate = existing.duplicate_of.is_none() && item.duplicate_of.is_some();

        if hash.deleted == Some(true) {
            item.clear_for_tombstone();
        } else {
            item.recompute_content_size();
        }

        item.updated_at_timestamp = self.clock.tick();

        let new_vault = item.shared_vault_uuid;
        let save_operation = match (had_vault, new_vault) {
            (None, None) => SaveOperation::Update,
            (None, Some(_)) => SaveOperation::AddToSharedVault,
            (Some(_), None) => SaveOperation::RemoveFromSharedVault,
            (Some(a), Some(b)) if a == b => SaveOperation::NoopInVault,
            (Some(_), Some(_)) => SaveOperation::RemoveFromSharedVault,
        };

        let persisted = self.repository.save(item)?;
        self.emit_events(save_operation, Some(existing.updated_at_timestamp), &persisted, was_marked_as_duplicate);

        if save_operation == SaveOperation::AddToSharedVault {
            if let Some(vault) = new_vault {
                if let Err(e) =
                    self.user_events
                        .remove_user_events_after_item_is_added_to_shared_vault(persisted.user_uuid, persisted.uuid, vault)
                {
                    warn!(error = %e, "failed to clear stale user events after shared-vault add; continuing");
                }
            }
        } else if save_operation == SaveOperation::RemoveFromSharedVault {
            if let Some(vault) = had_vault {
                if let Err(e) =
                    self.user_events
                        .create_item_removed_from_shared_vault_user_event(persisted.user_uuid, persisted.uuid, vault)
                {
                    warn!(error = %e, "failed to notify vault members of item removal; continuing");
                }
            }
        }

        Ok(persisted)
    }

    fn emit_events(
        &self,
        save_operation: SaveOperation,
        previous_updated_at: Option<Timestamp>,
        item: &Item,
        was_marked_as_duplicate: bool,
    ) {
        if item.content_type.is_revisionable() {
            let should_request_revision = match previous_updated_at {
                None => true,
                Some(previous) => item
                    .updated_at_timestamp
                    .duration_since(previous)
                    .map(|elapsed| elapsed.as_secs() >= self.config.revision_frequency_secs)
                    .unwrap_or(true),
            };
            if should_request_revision {
                self.publisher.publish(DomainEvent::ItemRevisionCreationRequested {
                    item_uuid: item.uuid,
                    user_uuid: item.user_uuid,
                });
            }
        }

        if was_marked_as_duplicate {
            self.publisher.publish(DomainEvent::DuplicateItemSynced {
                item_uuid: item.uuid,
                user_uuid: item.user_uuid,
            });
        }

        info!(uuid = %item.uuid, operation = ?save_operation, "item saved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemsync_core::{FixedStepClock, ItemUuid};
    use itemsync_repository::{
        InMemoryDomainEventPublisher, InMemoryItemRepository, InMemorySharedVaultUserRepository,
        InMemoryUserEventService, SharedVaultUser,
    };

    fn service_with(
        clock_start: u64,
    ) -> (
        ItemService,
        Arc<InMemoryItemRepository>,
        Arc<InMemorySharedVaultUserRepository>,
        Arc<InMemoryUserEventService>,
        Arc<InMemoryDomainEventPublisher>,
    ) {
        let repository = Arc::new(InMemoryItemRepository::new());
        let shared_vault_users = Arc::new(InMemorySharedVaultUserRepository::new());
        let user_events = Arc::new(InMemoryUserEventService::new());
        let publisher = Arc::new(InMemoryDomainEventPublisher::new());
        let clock = Arc::new(FixedStepClock::starting_at(Timestamp::from_micros(clock_start)));

        let service = ItemService::new(
            repository.clone(),
            shared_vault_users.clone(),
            user_events.clone(),
            publisher.clone(),
            clock,
            SyncConfig::default(),
        );
        (service, repository, shared_vault_users, user_events, publisher)
    }

    fn hash_with_content(content: &str) -> ItemHash {
        let mut hash = ItemHash::new(ItemUuid::new());
        hash.content = Some(content.as_bytes().to_vec());
        hash.content_type = Some(ContentType::Note);
        hash
    }

    #[test]
    fn create_then_read_back_delivers_initial_sync() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");

        let save = service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(save.saved_items.len(), 1);
        assert!(save.conflicts.is_empty());

        let read = service
            .get_items(
                GetItemsRequest {
                    user_uuid: user,
                    sync_token: None,
                    cursor_token: None,
                    limit: None,
                    content_type: None,
                    shared_vault_uuids: None,
                },
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(read.retrieved_items.len(), 1);
        assert!(read.sync_token.is_some());
        assert!(read.cursor_token.is_none());
    }

    #[test]
    fn read_only_access_rejects_every_write() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");

        let save = service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: true,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert!(save.saved_items.is_empty());
        assert_eq!(save.conflicts.len(), 1);
        assert_eq!(save.conflicts[0].kind, ConflictKind::ReadOnlyError);
    }

    #[test]
    fn stale_write_becomes_sync_conflict_with_server_item_attached() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");
        let uuid = hash.uuid;

        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let mut stale_hash = ItemHash::new(uuid);
        stale_hash.content = Some(b"changed".to_vec());
        stale_hash.updated_at_timestamp = Some(Timestamp::from_micros(1));

        let save = service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![stale_hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert!(save.saved_items.is_empty());
        assert_eq!(save.conflicts.len(), 1);
        assert_eq!(save.conflicts[0].kind, ConflictKind::SyncConflict);
        assert!(save.conflicts[0].server_item.is_some());
    }

    #[test]
    fn identical_resend_in_same_batch_is_idempotent() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");
        let repeated = hash.clone();

        let save = service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash, repeated],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(save.saved_items.len(), 2);
        assert!(save.conflicts.is_empty());
        assert_eq!(save.saved_items[0].updated_at_timestamp, save.saved_items[1].updated_at_timestamp);
    }

    #[test]
    fn deleting_an_item_clears_content_and_crypto_fields() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");
        let uuid = hash.uuid;

        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let mut delete_hash = ItemHash::new(uuid);
        delete_hash.deleted = Some(true);
        let save = service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![delete_hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let saved = &save.saved_items[0];
        assert!(saved.deleted);
        assert!(saved.content.is_none());
        assert_eq!(saved.content_size, 0);
    }

    #[test]
    fn add_to_shared_vault_clears_stale_user_events() {
        let (service, _repo, shared_vault_users, user_events, _publisher) = service_with(1_000);
        let user = UserUuid::new();
        let vault = SharedVaultUuid::new();
        shared_vault_users.add_membership(SharedVaultUser {
            shared_vault_uuid: vault,
            user_uuid: user,
            has_write_access: true,
        });

        let hash = hash_with_content("hello");
        let uuid = hash.uuid;
        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let mut move_hash = ItemHash::new(uuid);
        move_hash.shared_vault_uuid = Some(Some(vault));
        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![move_hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(user_events.calls().len(), 1);
    }

    #[test]
    fn remove_from_shared_vault_notifies_other_members() {
        let (service, _repo, shared_vault_users, user_events, _publisher) = service_with(1_000);
        let user = UserUuid::new();
        let vault = SharedVaultUuid::new();
        shared_vault_users.add_membership(SharedVaultUser {
            shared_vault_uuid: vault,
            user_uuid: user,
            has_write_access: true,
        });

        let mut hash = hash_with_content("hello");
        hash.shared_vault_uuid = Some(Some(vault));
        let uuid = hash.uuid;
        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let mut remove_hash = ItemHash::new(uuid);
        remove_hash.shared_vault_uuid = Some(None);
        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![remove_hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(user_events.calls().len(), 1);
    }

    #[test]
    fn note_creation_publishes_revision_event_unconditionally() {
        let (service, _repo, _svu, _ue, publisher) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");

        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let events = publisher.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::ItemRevisionCreationRequested { .. })));
    }

    #[test]
    fn duplicate_of_transition_publishes_duplicate_event() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let hash = hash_with_content("hello");
        let uuid = hash.uuid;

        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let mut dup_hash = ItemHash::new(uuid);
        dup_hash.duplicate_of = Some(ItemUuid::new());
        let result = service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![dup_hash],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(result.saved_items.len(), 1);
        assert!(result.saved_items[0].duplicate_of.is_some());
    }

    #[test]
    fn tombstones_hidden_on_initial_sync_but_visible_with_token() {
        let (service, ..) = service_with(1_000);
        let user = UserUuid::new();
        let live = hash_with_content("hello");
        let mut tombstone = hash_with_content("bye");
        tombstone.deleted = Some(true);

        service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![live, tombstone],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let initial = service
            .get_items(
                GetItemsRequest {
                    user_uuid: user,
                    sync_token: None,
                    cursor_token: None,
                    limit: None,
                    content_type: None,
                    shared_vault_uuids: None,
                },
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(initial.retrieved_items.len(), 1);
        assert!(!initial.retrieved_items[0].deleted);

        let followup = service
            .get_items(
                GetItemsRequest {
                    user_uuid: user,
                    sync_token: Some(SyncToken::encode(Timestamp::EPOCH)),
                    cursor_token: None,
                    limit: None,
                    content_type: None,
                    shared_vault_uuids: None,
                },
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(followup.retrieved_items.len(), 2);
    }

    #[test]
    fn transfer_budget_truncation_emits_cursor_token() {
        let (service, _repo, ..) = service_with(1_000);
        let user = UserUuid::new();
        let mut config = SyncConfig::default();
        config.content_transfer_budget = 1;
        let _ = config; // budget applied via a fresh service below

        let repository = Arc::new(InMemoryItemRepository::new());
        let shared_vault_users = Arc::new(InMemorySharedVaultUserRepository::new());
        let user_events = Arc::new(InMemoryUserEventService::new());
        let publisher = Arc::new(InMemoryDomainEventPublisher::new());
        let clock = Arc::new(FixedStepClock::starting_at(Timestamp::from_micros(1_000)));
        let mut tight_config = SyncConfig::default();
        tight_config.content_transfer_budget = 1;
        let tight_service = ItemService::new(
            repository.clone(),
            shared_vault_users,
            user_events,
            publisher,
            clock,
            tight_config,
        );

        let mut a = hash_with_content("aa");
        a.content = Some(vec![0u8; 10]);
        let mut b = hash_with_content("bb");
        b.content = Some(vec![0u8; 10]);

        tight_service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![a, b],
                },
                &CancellationToken::new(),
            )
            .unwrap();

        let read = tight_service
            .get_items(
                GetItemsRequest {
                    user_uuid: user,
                    sync_token: None,
                    cursor_token: None,
                    limit: None,
                    content_type: None,
                    shared_vault_uuids: None,
                },
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(read.retrieved_items.len(), 1);
        assert!(read.cursor_token.is_some());
        assert!(read.sync_token.is_none());
    }

    #[test]
    fn chained_cursors_across_a_budget_limited_page_eventually_cover_every_item() {
        let repository = Arc::new(InMemoryItemRepository::new());
        let shared_vault_users = Arc::new(InMemorySharedVaultUserRepository::new());
        let user_events = Arc::new(InMemoryUserEventService::new());
        let publisher = Arc::new(InMemoryDomainEventPublisher::new());
        let clock = Arc::new(FixedStepClock::starting_at(Timestamp::from_micros(1_000)));
        let user = UserUuid::new();

        let setup_service = ItemService::new(
            repository.clone(),
            shared_vault_users.clone(),
            user_events.clone(),
            publisher.clone(),
            clock.clone(),
            SyncConfig::default(),
        );

        let mut a = hash_with_content("a");
        a.content = Some(vec![1u8; 60]);
        let mut b = hash_with_content("b");
        b.content = Some(vec![2u8; 60]);
        let mut c = hash_with_content("c");
        c.content = Some(vec![3u8; 5]);

        let saved = setup_service
            .save_items(
                SaveItemsRequest {
                    user_uuid: user,
                    session_uuid: None,
                    api_version: "1".into(),
                    sdk_version: "1".into(),
                    read_only_access: false,
                    item_hashes: vec![a, b, c],
                },
                &CancellationToken::new(),
            )
            .unwrap()
            .saved_items;
        assert_eq!(saved.len(), 3);
        let all_uuids: std::collections::HashSet<_> = saved.iter().map(|i| i.uuid).collect();

        // Tight enough that the two large items never fit together, but a
        // large item plus the small one does: forces the budget, not the
        // page limit, to truncate the first page.
        let size_a = saved[0].content_size;
        let size_c = saved[2].content_size;
        let mut tight_config = SyncConfig::default();
        tight_config.content_transfer_budget = size_a + size_c;

        let tight_service = ItemService::new(
            repository,
            shared_vault_users,
            user_events,
            publisher,
            clock,
            tight_config,
        );

        let mut delivered: Vec<Item> = Vec::new();
        let mut cursor_token = None;
        let mut sync_token = None;
        let mut pages = 0;

        loop {
            pages += 1;
            assert!(pages <= 10, "did not converge: budget truncation is looping");

            let page = tight_service
                .get_items(
                    GetItemsRequest {
                        user_uuid: user,
                        sync_token: sync_token.take(),
                        cursor_token: cursor_token.take(),
                        limit: None,
                        content_type: None,
                        shared_vault_uuids: None,
                    },
                    &CancellationToken::new(),
                )
                .unwrap();

            delivered.extend(page.retrieved_items);
            cursor_token = page.cursor_token;
            sync_token = page.sync_token;

            if cursor_token.is_none() {
                break;
            }
        }

        assert_eq!(pages, 2, "expected the budget-truncated prefix on page 1 and the rest on page 2");
        let delivered_uuids: std::collections::HashSet<_> = delivered.iter().map(|i| i.uuid).collect();
        assert_eq!(delivered_uuids, all_uuids);
    }
}
