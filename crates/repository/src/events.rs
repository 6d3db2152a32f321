//! Domain event publishing and the user-event collaborator.

use itemsync_core::{ItemUuid, Result, SharedVaultUuid, Timestamp, TransitionStatusKind, UserUuid};
use parking_lot::Mutex;

/// A side-effect the item service or transition runner announces to the
/// rest of the system.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A revisionable item (`Note`/`File`) crossed the revision-snapshot
    /// threshold and should have a revision archived.
    ItemRevisionCreationRequested {
        /// The item.
        item_uuid: ItemUuid,
        /// Its owner.
        user_uuid: UserUuid,
    },
    /// An item's `duplicate_of` was newly set, either on create or on an
    /// update that transitioned it from empty to set.
    DuplicateItemSynced {
        /// The item.
        item_uuid: ItemUuid,
        /// Its owner.
        user_uuid: UserUuid,
    },
    /// A transition runner phase changed a user's migration status.
    TransitionStatusUpdated {
        /// The user being migrated.
        user_uuid: UserUuid,
        /// The new status.
        status: TransitionStatusKind,
        /// Free-form label for which transition this is (callers may run
        /// more than one kind of migration concurrently).
        transition_type: String,
        /// When the status changed.
        transition_timestamp: Timestamp,
    },
}

/// Publishes [`DomainEvent`]s. Publisher errors are logged and swallowed —
/// a sync must not fail because a downstream event could not be queued.
pub trait DomainEventPublisher: Send + Sync {
    /// Announce an event. Implementations should not block the caller on
    /// anything beyond handing the event to a buffer or channel.
    fn publish(&self, event: DomainEvent);
}

/// In-memory publisher that records every event it receives, for tests and
/// as the default implementation behind the root facade.
#[derive(Default)]
pub struct InMemoryDomainEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryDomainEventPublisher {
    /// Construct an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in order.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

impl DomainEventPublisher for InMemoryDomainEventPublisher {
    fn publish(&self, event: DomainEvent) {
        self.events.lock().push(event);
    }
}

/// User-visible notifications about an item's shared-vault membership
/// changing. Distinct from [`DomainEventPublisher`]: these are targeted at
/// specific users (other vault members) rather than broadcast internally.
pub trait UserEventService: Send + Sync {
    /// Remove any stale user events referencing `item_uuid` for
    /// `user_uuid`, called when an item is moved into a shared vault.
    fn remove_user_events_after_item_is_added_to_shared_vault(
        &self,
        user_uuid: UserUuid,
        item_uuid: ItemUuid,
        shared_vault_uuid: SharedVaultUuid,
    ) -> Result<()>;

    /// Create an `ItemRemovedFromSharedVault` notification for other vault
    /// members, called when an item leaves a shared vault.
    fn create_item_removed_from_shared_vault_user_event(
        &self,
        user_uuid: UserUuid,
        item_uuid: ItemUuid,
        shared_vault_uuid: SharedVaultUuid,
    ) -> Result<()>;
}

/// A single recorded user-event call, for inspection in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEventCall {
    /// A call to remove stale events after an add-to-vault.
    Removed {
        /// Target user.
        user_uuid: UserUuid,
        /// Item.
        item_uuid: ItemUuid,
        /// Vault.
        shared_vault_uuid: SharedVaultUuid,
    },
    /// A call to create a removal notification.
    Created {
        /// Target user.
        user_uuid: UserUuid,
        /// Item.
        item_uuid: ItemUuid,
        /// Vault.
        shared_vault_uuid: SharedVaultUuid,
    },
}

/// In-memory user-event service that records every call it receives.
#[derive(Default)]
pub struct InMemoryUserEventService {
    calls: Mutex<Vec<UserEventCall>>,
}

impl InMemoryUserEventService {
    /// Construct an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<UserEventCall> {
        self.calls.lock().clone()
    }
}

impl UserEventService for InMemoryUserEventService {
    fn remove_user_events_after_item_is_added_to_shared_vault(
        &self,
        user_uuid: UserUuid,
        item_uuid: ItemUuid,
        shared_vault_uuid: SharedVaultUuid,
    ) -> Result<()> {
        self.calls.lock().push(UserEventCall::Removed {
            user_uuid,
            item_uuid,
            shared_vault_uuid,
        });
        Ok(())
    }

    fn create_item_removed_from_shared_vault_user_event(
        &self,
        user_uuid: UserUuid,
        item_uuid: ItemUuid,
        shared_vault_uuid: SharedVaultUuid,
    ) -> Result<()> {
        self.calls.lock().push(UserEventCall::Created {
            user_uuid,
            item_uuid,
            shared_vault_uuid,
        });
        Ok(())
    }
}
