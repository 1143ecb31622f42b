//! Observable, persisted sync status.

use log::{error, warn};
use std::sync::Arc;
use tokio::sync::watch;

use super::sync_status_model::SyncStatus;
use super::sync_traits::SyncStatusRepositoryTrait;
use crate::errors::Result;

/// Holds the current `SyncStatus` and broadcasts every change.
///
/// Only the sync orchestrator writes; everyone else reads or subscribes.
pub struct SyncStatusTracker {
    repository: Arc<dyn SyncStatusRepositoryTrait>,
    sender: watch::Sender<SyncStatus>,
}

impl SyncStatusTracker {
    /// Loads the persisted status.
    ///
    /// A persisted `is_syncing = true` can only be left behind by a process
    /// that died mid-pass, so it is cleared here.
    pub async fn new(repository: Arc<dyn SyncStatusRepositoryTrait>) -> Result<Self> {
        let mut status = repository.get_sync_status()?;
        if status.is_syncing {
            warn!("[WallpaperSync] Clearing stale in-progress flag left by a previous run");
            status.is_syncing = false;
            repository.update_sync_status(status.clone()).await?;
        }

        let (sender, _) = watch::channel(status);
        Ok(Self { repository, sender })
    }

    pub fn current(&self) -> SyncStatus {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.sender.subscribe()
    }

    /// Applies `mutate` to the current status, persists it, then publishes it.
    ///
    /// The new status is published even when persisting fails, so in-process
    /// observers never see a stale `is_syncing`.
    pub(crate) async fn update<F>(&self, mutate: F) -> Result<SyncStatus>
    where
        F: FnOnce(&mut SyncStatus),
    {
        let mut next = self.current();
        mutate(&mut next);

        let persisted = self.repository.update_sync_status(next.clone()).await;
        if let Err(e) = &persisted {
            error!("[WallpaperSync] Failed to persist sync status: {}", e);
        }
        self.sender.send_replace(next.clone());
        persisted.map(|_| next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallpapers::InMemoryWallpaperStore;

    #[tokio::test]
    async fn stale_syncing_flag_is_cleared_on_start() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        store
            .update_sync_status(SyncStatus {
                is_syncing: true,
                total_synced: 7,
                ..Default::default()
            })
            .await
            .unwrap();

        let tracker = SyncStatusTracker::new(store.clone()).await.unwrap();
        assert!(!tracker.current().is_syncing);
        assert_eq!(tracker.current().total_synced, 7);
        assert!(!store.get_sync_status().unwrap().is_syncing);
    }

    #[tokio::test]
    async fn updates_are_persisted_and_published() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let tracker = SyncStatusTracker::new(store.clone()).await.unwrap();
        let mut receiver = tracker.subscribe();

        tracker
            .update(|status| {
                status.is_syncing = true;
                status.last_sync_count = 3;
            })
            .await
            .unwrap();

        receiver.changed().await.unwrap();
        assert!(receiver.borrow().is_syncing);
        assert_eq!(store.get_sync_status().unwrap().last_sync_count, 3);
        assert_eq!(tracker.current().last_sync_count, 3);
    }
}
