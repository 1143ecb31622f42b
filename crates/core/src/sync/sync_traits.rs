use async_trait::async_trait;
use tokio::sync::watch;

use super::sync_status_model::{SyncResult, SyncStatus};
use crate::errors::Result;

/// Storage for the single sync status row.
#[async_trait]
pub trait SyncStatusRepositoryTrait: Send + Sync {
    /// Returns defaults when no row has been written yet.
    fn get_sync_status(&self) -> Result<SyncStatus>;

    async fn update_sync_status(&self, status: SyncStatus) -> Result<()>;
}

#[async_trait]
pub trait WallpaperSyncServiceTrait: Send + Sync {
    /// Runs one sync pass, or joins the pass already in flight.
    ///
    /// Never fails or panics: every failure is reported as `SyncResult::Error`.
    async fn perform_sync(&self) -> SyncResult;

    fn status(&self) -> SyncStatus;

    fn subscribe_status(&self) -> watch::Receiver<SyncStatus>;
}
