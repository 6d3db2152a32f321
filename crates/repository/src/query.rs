//! Query shapes for [`crate::ItemRepository`]

use itemsync_core::{ContentType, ItemUuid, SharedVaultUuid, Timestamp, UserUuid};

/// How `last_sync_time` is compared against an item's `updated_at_timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `updated_at_timestamp > last_sync_time` — used for a sync token.
    GreaterThan,
    /// `updated_at_timestamp >= last_sync_time` — used for a cursor token,
    /// so an item landing exactly on the boundary is re-read rather than
    /// lost.
    GreaterOrEqual,
}

impl Comparator {
    /// Evaluate the comparison for a candidate timestamp.
    pub fn matches(&self, candidate: Timestamp, last_sync_time: Timestamp) -> bool {
        match self {
            Comparator::GreaterThan => candidate > last_sync_time,
            Comparator::GreaterOrEqual => candidate >= last_sync_time,
        }
    }
}

/// Field an ordered query sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Order by `created_at_timestamp`.
    CreatedAt,
    /// Order by `updated_at_timestamp`.
    UpdatedAt,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// How the query constrains an item's vault membership.
#[derive(Debug, Clone, Default)]
pub struct VaultScope {
    /// Include items in the user's own private scope plus any of these
    /// vaults.
    pub include_shared_vault_uuids: Vec<SharedVaultUuid>,
    /// Restrict to items in exactly these vaults, excluding private items.
    /// Used by the transition runner's cleanup phase.
    pub exclusive_shared_vault_uuids: Vec<SharedVaultUuid>,
    /// Ignore vault scoping entirely: match every item owned by the user,
    /// private or shared. Used by the transition runner's copy/verify
    /// phases, which must move a user's entire item set regardless of
    /// vault membership.
    pub all_vaults: bool,
}

/// A filtered, ordered, paginated view over one user's items.
#[derive(Debug, Clone)]
pub struct ItemQuery {
    /// Owning user. Every query is scoped to exactly one user.
    pub user_uuid: UserUuid,
    /// Vault inclusion/exclusion filters.
    pub vault_scope: VaultScope,
    /// `updated_at_timestamp` boundary, paired with `comparator`.
    pub last_sync_time: Option<Timestamp>,
    /// How `last_sync_time` is compared.
    pub comparator: Comparator,
    /// Restrict to a single content type, if set.
    pub content_type: Option<ContentType>,
    /// `Some(true)`/`Some(false)` restricts to tombstones/live items;
    /// `None` returns both.
    pub deleted: Option<bool>,
    /// Restrict to exactly these uuids, if set (used by the transfer
    /// calculator's hydration step).
    pub uuids: Option<Vec<ItemUuid>>,
    /// Sort field.
    pub sort_key: SortKey,
    /// Sort direction.
    pub sort_direction: SortDirection,
    /// Skip this many matching rows before collecting results.
    pub offset: usize,
    /// Maximum number of rows to return.
    pub limit: usize,
}

impl ItemQuery {
    /// Start building a query scoped to `user_uuid`, with the defaults the
    /// read-sync algorithm uses: unbounded vault scope, no time filter,
    /// `>` comparator, `updated_at_timestamp ASC`, no offset.
    pub fn for_user(user_uuid: UserUuid) -> Self {
        Self {
            user_uuid,
            vault_scope: VaultScope::default(),
            last_sync_time: None,
            comparator: Comparator::GreaterThan,
            content_type: None,
            deleted: None,
            uuids: None,
            sort_key: SortKey::UpdatedAt,
            sort_direction: SortDirection::Ascending,
            offset: 0,
            limit: usize::MAX,
        }
    }

    /// Like [`Self::for_user`] but matching every item regardless of vault
    /// membership, for callers (the transition runner) that need a user's
    /// entire item set.
    pub fn for_user_across_all_vaults(user_uuid: UserUuid) -> Self {
        Self {
            vault_scope: VaultScope {
                all_vaults: true,
                ..VaultScope::default()
            },
            ..Self::for_user(user_uuid)
        }
    }

    /// A copy of this query with `limit`/`offset`/`uuids` cleared, used to
    /// compute `count_all` under the same filters.
    pub fn without_pagination(&self) -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
            uuids: None,
            ..self.clone()
        }
    }
}
