//! # itemsync
//!
//! Sync engine for a multi-tenant, end-to-end-encrypted notes backend:
//! incremental read/write sync over an arbitrary [`ItemRepository`],
//! shared-vault conflict handling, and a resumable transition runner for
//! moving a user's items between two repositories.
//!
//! # Quick Start
//!
//! ```
//! use itemsync::{
//!     GetItemsRequest, InMemoryDomainEventPublisher, InMemoryItemRepository,
//!     InMemorySharedVaultUserRepository, InMemoryUserEventService, ItemService,
//!     MonotonicClock, SaveItemsRequest, SyncConfig, UserUuid,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> itemsync::Result<()> {
//! let service = ItemService::new(
//!     Arc::new(InMemoryItemRepository::new()),
//!     Arc::new(InMemorySharedVaultUserRepository::new()),
//!     Arc::new(InMemoryUserEventService::new()),
//!     Arc::new(InMemoryDomainEventPublisher::new()),
//!     Arc::new(MonotonicClock::new()),
//!     SyncConfig::default(),
//! );
//!
//! let user_uuid = UserUuid::new();
//! let initial = service.get_items(GetItemsRequest {
//!     user_uuid,
//!     sync_token: None,
//!     cursor_token: None,
//!     limit: None,
//!     content_type: None,
//!     shared_vault_uuids: None,
//! })?;
//! assert!(initial.retrieved_items.is_empty());
//!
//! let _saved = service.save_items(SaveItemsRequest {
//!     user_uuid,
//!     session_uuid: None,
//!     api_version: "20240226".into(),
//!     sdk_version: "2.0.0".into(),
//!     read_only_access: false,
//!     item_hashes: Vec::new(),
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! # Workspace
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `itemsync-core` | Identifiers, timestamps, the item model, the unified error type |
//! | `itemsync-repository` | The [`ItemRepository`] contract, an in-memory implementation, vault and event collaborators |
//! | `itemsync-sync` | The token codec, transfer calculator, save validator, and [`ItemService`] that orchestrates them |
//! | `itemsync-transition` | [`TransitionRunner`], for migrating a user's items between two repositories |
//!
//! Only the surface re-exported here is considered stable; depend on the
//! path crates directly if you need something this facade doesn't expose.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use itemsync_core::{
    Clock, ConflictKind, ContentType, Error, FixedStepClock, Item, ItemConflict, ItemHash, ItemUuid,
    KeySystemIdentifier, MonotonicClock, Result, SessionUuid, SharedVaultUuid, Timestamp,
    TransitionStatusKind, UserUuid,
};

pub use itemsync_repository::{
    Comparator, DomainEvent, DomainEventPublisher, InMemoryDomainEventPublisher,
    InMemoryItemRepository, InMemorySharedVaultUserRepository, InMemoryUserEventService, ItemQuery,
    ItemRepository, SharedVaultUser, SharedVaultUserRepository, SortDirection, SortKey,
    UserEventCall, UserEventService, VaultScope,
};

pub use itemsync_sync::{
    select_within_budget, CancellationToken, ContentTypeRule, CursorToken, GetItemsRequest,
    GetItemsResult, IdempotentResendRule, ItemService, RuleOutcome, SaveItemsRequest,
    SaveItemsResult, SaveValidator, SharedVaultPermissionRule, SyncConfig, SyncConflictRule,
    SyncToken, ValidationContext, ValidationRule,
};

pub use itemsync_transition::{
    InMemoryTransitionStatusStore, NoopSleeper, Sleeper, ThreadSleeper, TransitionRunner,
    TransitionStatus, TransitionStatusStore,
};
