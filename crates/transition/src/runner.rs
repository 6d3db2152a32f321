//! Transition runner (C6): resumable, verified bulk copy of one user's
//! items from a source repository to a target repository.

use crate::sleeper::Sleeper;
use crate::status::{TransitionStatus, TransitionStatusStore};
use itemsync_core::{Clock, Error, Item, Result, TransitionStatusKind, UserUuid};
use itemsync_repository::{DomainEvent, DomainEventPublisher, ItemQuery, ItemRepository, SortDirection, SortKey};
use itemsync_sync::SyncConfig;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Moves one user's items between two [`ItemRepository`] instances. Names
/// are symmetric: `source`/`target` describe one direction of a migration
/// that could equally run the other way with the repositories swapped.
pub struct TransitionRunner {
    source: Arc<dyn ItemRepository>,
    target: Arc<dyn ItemRepository>,
    status_store: Arc<dyn TransitionStatusStore>,
    publisher: Arc<dyn DomainEventPublisher>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    config: SyncConfig,
    transition_type: String,
    running: Mutex<HashSet<UserUuid>>,
}

impl TransitionRunner {
    /// Wire together a transition runner from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn ItemRepository>,
        target: Arc<dyn ItemRepository>,
        status_store: Arc<dyn TransitionStatusStore>,
        publisher: Arc<dyn DomainEventPublisher>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
        config: SyncConfig,
        transition_type: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            status_store,
            publisher,
            clock,
            sleeper,
            config,
            transition_type: transition_type.into(),
            running: Mutex::new(HashSet::new()),
        }
    }

    fn enter(&self, user_uuid: UserUuid) -> Result<()> {
        let mut running = self.running.lock();
        if !running.insert(user_uuid) {
            return Err(Error::transient(format!(
                "a transition is already running for user {user_uuid}"
            )));
        }
        Ok(())
    }

    fn leave(&self, user_uuid: UserUuid) {
        self.running.lock().remove(&user_uuid);
    }

    fn emit_status(&self, user_uuid: UserUuid, status: TransitionStatusKind) {
        self.publisher.publish(DomainEvent::TransitionStatusUpdated {
            user_uuid,
            status,
            transition_type: self.transition_type.clone(),
            transition_timestamp: self.clock.tick(),
        });
    }

    /// `page_number` is 1-based, matching [`TransitionStatus`]'s progress
    /// counters.
    fn page_query(user_uuid: UserUuid, sort_key: SortKey, page_number: usize, page_size: usize) -> ItemQuery {
        ItemQuery {
            offset: page_number.saturating_sub(1) * page_size,
            limit: page_size,
            sort_key,
            sort_direction: SortDirection::Ascending,
            ..ItemQuery::for_user_across_all_vaults(user_uuid)
        }
    }

    /// Run every phase for `user_uuid`, resuming from whatever progress was
    /// previously persisted. Only one call per user may be in flight at a
    /// time; a concurrent call returns a transient error.
    #[instrument(skip(self), fields(user_uuid = %user_uuid))]
    pub fn run(&self, user_uuid: UserUuid) -> Result<TransitionStatus> {
        self.enter(user_uuid)?;
        let result = self.run_locked(user_uuid);
        self.leave(user_uuid);
        result
    }

    fn run_locked(&self, user_uuid: UserUuid) -> Result<TransitionStatus> {
        if let Some(status) = self.precondition(user_uuid)? {
            return Ok(status);
        }

        self.emit_status(user_uuid, TransitionStatusKind::InProgress);
        let mut status = self.status_store.get(user_uuid);
        status.status = TransitionStatusKind::InProgress;
        self.status_store.put(user_uuid, status);

        self.copy(user_uuid)?;
        self.sleeper.sleep(Duration::from_millis(self.config.settle_delay_ms));

        if let Some(failed) = self.verify(user_uuid)? {
            return Ok(failed);
        }

        self.cleanup(user_uuid)?;
        self.finalize(user_uuid)
    }

    fn precondition(&self, user_uuid: UserUuid) -> Result<Option<TransitionStatus>> {
        let mut probe = ItemQuery::for_user_across_all_vaults(user_uuid);
        probe.limit = 1;
        let already_migrated = !self.target.find_all(&probe)?.is_empty();

        if already_migrated {
            let status = TransitionStatus {
                paging_progress: 1,
                integrity_progress: 1,
                status: TransitionStatusKind::Verified,
            };
            self.status_store.put(user_uuid, status);
            self.emit_status(user_uuid, TransitionStatusKind::Verified);
            info!(uuid = %user_uuid, "target already has items for user; treating as migrated");
            return Ok(Some(status));
        }

        Ok(None)
    }

    fn total_pages(&self, repository: &Arc<dyn ItemRepository>, user_uuid: UserUuid) -> Result<usize> {
        let total = repository.count_all(&ItemQuery::for_user_across_all_vaults(user_uuid))?;
        let page_size = self.config.page_size.max(1);
        Ok(((total + page_size - 1) / page_size).max(1))
    }

    fn copy(&self, user_uuid: UserUuid) -> Result<()> {
        let total_pages = self.total_pages(&self.source, user_uuid)?;
        let checkpoint_every = (total_pages / 10).max(1);
        let mut page_number = self.status_store.get(user_uuid).paging_progress;

        loop {
            let query = Self::page_query(user_uuid, SortKey::CreatedAt, page_number, self.config.page_size);
            let page = self.source.find_all(&query)?;
            if page.is_empty() {
                break;
            }

            for item in &page {
                self.copy_one(user_uuid, item)?;
            }

            page_number += 1;
            let mut status = self.status_store.get(user_uuid);
            status.paging_progress = page_number;
            self.status_store.put(user_uuid, status);

            if page_number % checkpoint_every == 0 {
                self.emit_status(user_uuid, TransitionStatusKind::InProgress);
            }

            if page.len() < self.config.page_size {
                break;
            }
        }

        Ok(())
    }

    fn copy_one(&self, user_uuid: UserUuid, source_item: &Item) -> Result<()> {
        let existing = self.target.find_by_uuid(user_uuid, source_item.uuid)?;

        if let Some(target_item) = &existing {
            if target_item.updated_at_timestamp > source_item.updated_at_timestamp {
                return Ok(());
            }
            if target_item.is_identical_to(source_item) {
                return Ok(());
            }
            self.sleeper.sleep(Duration::from_millis(self.config.settle_delay_ms));
            self.target.remove_by_uuid(user_uuid, source_item.uuid)?;
        }

        self.target.save(source_item.clone())?;
        Ok(())
    }

    fn verify(&self, user_uuid: UserUuid) -> Result<Option<TransitionStatus>> {
        let mut page_number = self.status_store.get(user_uuid).integrity_progress;

        loop {
            let query = Self::page_query(user_uuid, SortKey::UpdatedAt, page_number, self.config.page_size);
            let page = self.target.find_all(&query)?;
            if page.is_empty() {
                break;
            }

            for target_item in &page {
                let matches = match self.source.find_by_uuid(user_uuid, target_item.uuid)? {
                    None => false,
                    Some(source_item) => {
                        source_item.updated_at_timestamp <= target_item.updated_at_timestamp
                            && source_item.is_identical_to(target_item)
                    }
                };

                if !matches {
                    warn!(uuid = %target_item.uuid, "verification failed; resetting progress");
                    let failed = TransitionStatus {
                        paging_progress: 1,
                        integrity_progress: 1,
                        status: TransitionStatusKind::Failed,
                    };
                    self.status_store.put(user_uuid, failed);
                    self.emit_status(user_uuid, TransitionStatusKind::Failed);
                    return Ok(Some(failed));
                }
            }

            page_number += 1;
            let mut status = self.status_store.get(user_uuid);
            status.integrity_progress = page_number;
            self.status_store.put(user_uuid, status);

            if page.len() < self.config.page_size {
                break;
            }
        }

        Ok(None)
    }

    fn cleanup(&self, user_uuid: UserUuid) -> Result<()> {
        let removed = self.source.delete_by_user_uuid_and_not_in_shared_vault(user_uuid)?;
        info!(uuid = %user_uuid, removed, "cleaned up source-side private items");
        Ok(())
    }

    fn finalize(&self, user_uuid: UserUuid) -> Result<TransitionStatus> {
        let status = TransitionStatus {
            paging_progress: self.status_store.get(user_uuid).paging_progress,
            integrity_progress: self.status_store.get(user_uuid).integrity_progress,
            status: TransitionStatusKind::Verified,
        };
        self.status_store.put(user_uuid, status);
        self.emit_status(user_uuid, TransitionStatusKind::Verified);
        Ok(status)
    }
}
