use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use wallsync_core::wallpapers::{CanonicalWallpaper, InsertOutcome, WallpaperRepositoryTrait};
use wallsync_core::Result;
use wallsync_providers::{WallpaperCategory, WallpaperSource};

use super::model::{timestamp_to_db, WallpaperDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::wallpapers;

/// Upper bound on bound parameters per `IN (...)` lookup.
const LOOKUP_CHUNK_SIZE: usize = 500;

pub struct WallpaperRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl WallpaperRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        WallpaperRepository { pool, writer }
    }

    fn to_domain(rows: Vec<WallpaperDB>) -> Result<Vec<CanonicalWallpaper>> {
        rows.into_iter()
            .map(|row| CanonicalWallpaper::try_from(row).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl WallpaperRepositoryTrait for WallpaperRepository {
    fn existing_source_ids(
        &self,
        source: WallpaperSource,
        source_local_ids: &[String],
    ) -> Result<HashSet<String>> {
        if source_local_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let mut conn = get_connection(&self.pool)?;
        let mut found = HashSet::new();
        for chunk in source_local_ids.chunks(LOOKUP_CHUNK_SIZE) {
            let ids = wallpapers::table
                .filter(wallpapers::source.eq(source.as_str()))
                .filter(wallpapers::source_local_id.eq_any(chunk))
                .select(wallpapers::source_local_id)
                .load::<String>(&mut conn)
                .map_err(StorageError::from)?;
            found.extend(ids);
        }
        Ok(found)
    }

    async fn insert_many(
        &self,
        new_wallpapers: Vec<CanonicalWallpaper>,
    ) -> Result<Vec<InsertOutcome>> {
        if new_wallpapers.is_empty() {
            return Ok(Vec::new());
        }
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<InsertOutcome>> {
                let mut outcomes = Vec::with_capacity(new_wallpapers.len());
                for wallpaper in new_wallpapers {
                    let row = WallpaperDB::from(wallpaper);
                    let affected = diesel::insert_or_ignore_into(wallpapers::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    outcomes.push(if affected > 0 {
                        InsertOutcome::Inserted(row.id)
                    } else {
                        InsertOutcome::Duplicate(row.id)
                    });
                }
                debug!(
                    "Inserted {} of {} wallpapers",
                    outcomes.iter().filter(|o| o.is_inserted()).count(),
                    outcomes.len()
                );
                Ok(outcomes)
            })
            .await
    }

    fn get_wallpaper(&self, wallpaper_id: &str) -> Result<Option<CanonicalWallpaper>> {
        let mut conn = get_connection(&self.pool)?;
        let row = wallpapers::table
            .find(wallpaper_id)
            .first::<WallpaperDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(CanonicalWallpaper::try_from).transpose()?)
    }

    fn list_wallpapers(
        &self,
        category: Option<WallpaperCategory>,
        limit: i64,
    ) -> Result<Vec<CanonicalWallpaper>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = wallpapers::table
            .select(WallpaperDB::as_select())
            .into_boxed();
        if let Some(category) = category {
            query = query.filter(wallpapers::category.eq(category.as_str()));
        }
        let rows = query
            .order((wallpapers::synced_at.desc(), wallpapers::id.asc()))
            .limit(limit.max(0))
            .load::<WallpaperDB>(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_domain(rows)
    }

    fn count_wallpapers(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let total = wallpapers::table
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(total)
    }

    async fn mark_viewed(&self, wallpaper_id: String) -> Result<bool> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected = diesel::update(wallpapers::table.find(wallpaper_id))
                    .set(wallpapers::viewed.eq(true))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }

    async fn update_cache_state(
        &self,
        wallpaper_id: String,
        local_cache_path: Option<String>,
    ) -> Result<bool> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected = diesel::update(wallpapers::table.find(wallpaper_id))
                    .set((
                        wallpapers::is_cached.eq(local_cache_path.is_some()),
                        wallpapers::local_cache_path.eq(local_cache_path),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }

    async fn delete_uncached_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = timestamp_to_db(&cutoff);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let deleted = diesel::delete(
                    wallpapers::table
                        .filter(wallpapers::is_cached.eq(false))
                        .filter(wallpapers::synced_at.lt(cutoff)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(deleted)
            })
            .await
    }
}
