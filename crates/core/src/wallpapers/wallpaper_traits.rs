use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use wallsync_providers::{WallpaperCategory, WallpaperSource};

use super::wallpaper_model::{CanonicalWallpaper, InsertOutcome};
use crate::errors::Result;

/// Persistence for canonical wallpapers.
///
/// Rows are only ever added by sync; existing rows are never overwritten.
/// Reads are synchronous, writes go through the backend's writer and are async.
#[async_trait]
pub trait WallpaperRepositoryTrait: Send + Sync {
    /// Returns the subset of `source_local_ids` already stored for `source`.
    fn existing_source_ids(
        &self,
        source: WallpaperSource,
        source_local_ids: &[String],
    ) -> Result<HashSet<String>>;

    /// Insert-if-absent for every record, atomically for the whole call.
    ///
    /// Outcomes are returned in input order.
    async fn insert_many(&self, wallpapers: Vec<CanonicalWallpaper>)
        -> Result<Vec<InsertOutcome>>;

    fn get_wallpaper(&self, wallpaper_id: &str) -> Result<Option<CanonicalWallpaper>>;

    /// Newest first by `synced_at`.
    fn list_wallpapers(
        &self,
        category: Option<WallpaperCategory>,
        limit: i64,
    ) -> Result<Vec<CanonicalWallpaper>>;

    fn count_wallpapers(&self) -> Result<i64>;

    /// Returns false when no row has this id.
    async fn mark_viewed(&self, wallpaper_id: String) -> Result<bool>;

    /// Sets `local_cache_path`; `is_cached` follows whether a path is present.
    async fn update_cache_state(
        &self,
        wallpaper_id: String,
        local_cache_path: Option<String>,
    ) -> Result<bool>;

    /// Deletes uncached rows synced strictly before `cutoff`.
    async fn delete_uncached_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}
