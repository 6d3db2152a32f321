//! Per-user transition progress tracking.

use itemsync_core::{TransitionStatusKind, UserUuid};
use std::collections::HashMap;
use std::sync::RwLock;

/// Progress record for one user's migration.
///
/// `paging_progress`/`integrity_progress` are 1-based: the next page number
/// the copy/verify phase should fetch. Both start at `1` (no pages
/// completed yet), so resetting either one to `1` after a failed
/// verification forces a full recheck from the first page, not a
/// resumption partway through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionStatus {
    /// Next copy-phase page to fetch.
    pub paging_progress: usize,
    /// Next verify-phase page to fetch.
    pub integrity_progress: usize,
    /// Current lifecycle state.
    pub status: TransitionStatusKind,
}

impl TransitionStatus {
    /// A record for a user that has not started migrating.
    pub fn not_started() -> Self {
        Self {
            paging_progress: 1,
            integrity_progress: 1,
            status: TransitionStatusKind::NotStarted,
        }
    }
}

impl Default for TransitionStatus {
    fn default() -> Self {
        Self::not_started()
    }
}

/// Persists [`TransitionStatus`] keyed by user, so a crashed run resumes at
/// its last persisted page rather than from the start.
pub trait TransitionStatusStore: Send + Sync {
    /// The current record for `user_uuid`, or [`TransitionStatus::not_started`]
    /// if none has been written yet.
    fn get(&self, user_uuid: UserUuid) -> TransitionStatus;

    /// Overwrite the record for `user_uuid`.
    fn put(&self, user_uuid: UserUuid, status: TransitionStatus);
}

/// In-memory status store.
#[derive(Default)]
pub struct InMemoryTransitionStatusStore {
    records: RwLock<HashMap<UserUuid, TransitionStatus>>,
}

impl InMemoryTransitionStatusStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransitionStatusStore for InMemoryTransitionStatusStore {
    fn get(&self, user_uuid: UserUuid) -> TransitionStatus {
        self.records
            .read()
            .unwrap()
            .get(&user_uuid)
            .copied()
            .unwrap_or_default()
    }

    fn put(&self, user_uuid: UserUuid, status: TransitionStatus) {
        self.records.write().unwrap().insert(user_uuid, status);
    }
}
