//! In-process store implementing both repository traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock};
use wallsync_providers::{WallpaperCategory, WallpaperSource};

use super::wallpaper_model::{CanonicalWallpaper, InsertOutcome};
use super::wallpaper_traits::WallpaperRepositoryTrait;
use crate::errors::Result;
use crate::sync::{SyncStatus, SyncStatusRepositoryTrait};

/// Volatile store for ephemeral runs and tests.
///
/// Each write call takes one write guard, so a batch is applied atomically.
#[derive(Default)]
pub struct InMemoryWallpaperStore {
    wallpapers: RwLock<BTreeMap<String, CanonicalWallpaper>>,
    status: RwLock<Option<SyncStatus>>,
}

impl InMemoryWallpaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `wallpapers`, ignoring duplicates.
    pub fn with_wallpapers(wallpapers: impl IntoIterator<Item = CanonicalWallpaper>) -> Self {
        let store = Self::new();
        {
            let mut rows = store
                .wallpapers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            for wallpaper in wallpapers {
                rows.entry(wallpaper.id.clone()).or_insert(wallpaper);
            }
        }
        store
    }

    fn update_row<F>(&self, wallpaper_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut CanonicalWallpaper),
    {
        let mut rows = self
            .wallpapers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(wallpaper_id) {
            Some(row) => {
                mutate(row);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl WallpaperRepositoryTrait for InMemoryWallpaperStore {
    fn existing_source_ids(
        &self,
        source: WallpaperSource,
        source_local_ids: &[String],
    ) -> Result<HashSet<String>> {
        let rows = self.wallpapers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(source_local_ids
            .iter()
            .filter(|local_id| {
                rows.contains_key(&CanonicalWallpaper::canonical_id(source, local_id))
            })
            .cloned()
            .collect())
    }

    async fn insert_many(
        &self,
        wallpapers: Vec<CanonicalWallpaper>,
    ) -> Result<Vec<InsertOutcome>> {
        let mut rows = self
            .wallpapers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let outcomes = wallpapers
            .into_iter()
            .map(|wallpaper| {
                let id = wallpaper.id.clone();
                if rows.contains_key(&id) {
                    InsertOutcome::Duplicate(id)
                } else {
                    rows.insert(id.clone(), wallpaper);
                    InsertOutcome::Inserted(id)
                }
            })
            .collect();
        Ok(outcomes)
    }

    fn get_wallpaper(&self, wallpaper_id: &str) -> Result<Option<CanonicalWallpaper>> {
        let rows = self.wallpapers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(wallpaper_id).cloned())
    }

    fn list_wallpapers(
        &self,
        category: Option<WallpaperCategory>,
        limit: i64,
    ) -> Result<Vec<CanonicalWallpaper>> {
        let rows = self.wallpapers.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<CanonicalWallpaper> = rows
            .values()
            .filter(|w| category.map_or(true, |c| w.category == c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.synced_at.cmp(&a.synced_at).then_with(|| a.id.cmp(&b.id)));
        matching.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(matching)
    }

    fn count_wallpapers(&self) -> Result<i64> {
        let rows = self.wallpapers.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.len() as i64)
    }

    async fn mark_viewed(&self, wallpaper_id: String) -> Result<bool> {
        Ok(self.update_row(&wallpaper_id, |row| row.viewed = true))
    }

    async fn update_cache_state(
        &self,
        wallpaper_id: String,
        local_cache_path: Option<String>,
    ) -> Result<bool> {
        Ok(self.update_row(&wallpaper_id, |row| {
            row.is_cached = local_cache_path.is_some();
            row.local_cache_path = local_cache_path;
        }))
    }

    async fn delete_uncached_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut rows = self
            .wallpapers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = rows.len();
        rows.retain(|_, row| row.is_cached || row.synced_at >= cutoff);
        Ok(before - rows.len())
    }
}

#[async_trait]
impl SyncStatusRepositoryTrait for InMemoryWallpaperStore {
    fn get_sync_status(&self) -> Result<SyncStatus> {
        let status = self.status.read().unwrap_or_else(PoisonError::into_inner);
        Ok(status.clone().unwrap_or_default())
    }

    async fn update_sync_status(&self, status: SyncStatus) -> Result<()> {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = Some(status);
        Ok(())
    }
}
