//! Item storage and its collaborator interfaces: the [`ItemRepository`]
//! contract and an in-memory implementation, vault-membership lookups, and
//! domain/user event publishing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod events;
pub mod query;
pub mod repository;
pub mod shared_vault;

pub use events::{
    DomainEvent, DomainEventPublisher, InMemoryDomainEventPublisher, InMemoryUserEventService,
    UserEventCall, UserEventService,
};
pub use query::{Comparator, ItemQuery, SortDirection, SortKey, VaultScope};
pub use repository::{InMemoryItemRepository, ItemRepository};
pub use shared_vault::{InMemorySharedVaultUserRepository, SharedVaultUser, SharedVaultUserRepository};
