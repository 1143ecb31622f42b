//! Service wiring for the daemon.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wallsync_core::sync::{
    SchedulerConfig, SyncScheduler, SyncStatusRepositoryTrait, SyncStatusTracker, SyncTarget,
    WallpaperSyncService, WallpaperSyncServiceTrait,
};
use wallsync_core::wallpapers::WallpaperRepositoryTrait;
use wallsync_providers::{build_providers, WallpaperCategory};
use wallsync_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, SyncStatusRepository, WallpaperRepository,
};

use crate::config::Config;

/// Shared handles passed to every request handler.
pub struct AppState {
    pub wallpaper_repository: Arc<dyn WallpaperRepositoryTrait>,
    pub sync_service: Arc<dyn WallpaperSyncServiceTrait>,
    pub scheduler: Arc<SyncScheduler>,
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Opens the database, builds providers and wires the sync stack.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.data_dir).context("failed to prepare data directory")?;
    run_migrations(&db_path).context("failed to run database migrations")?;
    let pool = create_pool(&db_path).context("failed to open database pool")?;
    let writer = spawn_writer(pool.as_ref().clone());
    info!("Database ready at {}", db_path);

    let wallpaper_repository: Arc<dyn WallpaperRepositoryTrait> =
        Arc::new(WallpaperRepository::new(pool.clone(), writer.clone()));
    let status_repository: Arc<dyn SyncStatusRepositoryTrait> =
        Arc::new(SyncStatusRepository::new(pool, writer));

    let providers = build_providers(&config.providers);
    if providers.is_empty() {
        warn!("No wallpaper providers configured; every sync pass will fail");
    }
    let targets = SyncTarget::for_providers(providers, WallpaperCategory::New);

    let tracker = Arc::new(
        SyncStatusTracker::new(status_repository)
            .await
            .context("failed to load sync status")?,
    );
    let sync_service: Arc<dyn WallpaperSyncServiceTrait> = Arc::new(WallpaperSyncService::new(
        targets,
        wallpaper_repository.clone(),
        tracker,
        config.provider_timeout,
    ));

    let scheduler_config = SchedulerConfig {
        interval: config.sync_interval,
        ..SchedulerConfig::default()
    };
    let mut scheduler = SyncScheduler::new(sync_service.clone(), scheduler_config);
    if let Some(max_age) = config.retention {
        scheduler = scheduler.with_retention(wallpaper_repository.clone(), max_age);
    }

    Ok(Arc::new(AppState {
        wallpaper_repository,
        sync_service,
        scheduler: Arc::new(scheduler),
    }))
}

/// Logs every status transition published by the tracker.
pub fn spawn_status_logger(state: &AppState) -> JoinHandle<()> {
    let mut updates = state.sync_service.subscribe_status();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            if status.is_syncing {
                info!("[WallpaperSync] Pass started");
                continue;
            }
            match status.last_error {
                Some(error) => warn!(
                    "[WallpaperSync] Pass finished with errors ({} consecutive failures): {}",
                    status.consecutive_failures, error
                ),
                None => info!(
                    "[WallpaperSync] Pass finished: {} new, {} total",
                    status.last_sync_count, status.total_synced
                ),
            }
        }
    })
}
