//! Database model for stored wallpapers.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use wallsync_core::wallpapers::CanonicalWallpaper;
use wallsync_providers::{WallpaperCategory, WallpaperSource};

use crate::errors::StorageError;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::wallpapers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WallpaperDB {
    pub id: String,
    pub source_local_id: String,
    pub source: String,
    pub thumbnail_url: String,
    pub preview_url: String,
    pub full_url: String,
    pub original_url: String,
    pub width: i32,
    pub height: i32,
    pub category: String,
    pub photographer_name: String,
    pub photographer_url: Option<String>,
    pub source_url: String,
    pub description: String,
    pub tags: String,
    pub likes: i64,
    pub dominant_color: Option<String>,
    pub is_premium: bool,
    pub created_at: Option<String>,
    pub synced_at: String,
    pub viewed: bool,
    pub is_cached: bool,
    pub local_cache_path: Option<String>,
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
pub(crate) fn timestamp_to_db(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp_from_db(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData(format!("bad timestamp '{}': {}", value, e)))
}

impl From<CanonicalWallpaper> for WallpaperDB {
    fn from(wallpaper: CanonicalWallpaper) -> Self {
        let tags = serde_json::to_string(&wallpaper.tags).unwrap_or_else(|_| "[]".to_string());
        WallpaperDB {
            id: wallpaper.id,
            source_local_id: wallpaper.source_local_id,
            source: wallpaper.source.as_str().to_string(),
            thumbnail_url: wallpaper.thumbnail_url,
            preview_url: wallpaper.preview_url,
            full_url: wallpaper.full_url,
            original_url: wallpaper.original_url,
            width: wallpaper.width,
            height: wallpaper.height,
            category: wallpaper.category.as_str().to_string(),
            photographer_name: wallpaper.photographer_name,
            photographer_url: wallpaper.photographer_url,
            source_url: wallpaper.source_url,
            description: wallpaper.description,
            tags,
            likes: wallpaper.likes,
            dominant_color: wallpaper.dominant_color,
            is_premium: wallpaper.is_premium,
            created_at: wallpaper.created_at.as_ref().map(timestamp_to_db),
            synced_at: timestamp_to_db(&wallpaper.synced_at),
            viewed: wallpaper.viewed,
            is_cached: wallpaper.is_cached,
            local_cache_path: wallpaper.local_cache_path,
        }
    }
}

impl TryFrom<WallpaperDB> for CanonicalWallpaper {
    type Error = StorageError;

    fn try_from(row: WallpaperDB) -> Result<Self, Self::Error> {
        let source = row
            .source
            .parse::<WallpaperSource>()
            .map_err(StorageError::InvalidData)?;
        let category = row
            .category
            .parse::<WallpaperCategory>()
            .map_err(StorageError::InvalidData)?;
        let tags: Vec<String> = serde_json::from_str(&row.tags).map_err(|e| {
            StorageError::InvalidData(format!("bad tags for '{}': {}", row.id, e))
        })?;
        let created_at = row
            .created_at
            .as_deref()
            .map(timestamp_from_db)
            .transpose()?;
        let synced_at = timestamp_from_db(&row.synced_at)?;

        Ok(CanonicalWallpaper {
            id: row.id,
            source_local_id: row.source_local_id,
            source,
            thumbnail_url: row.thumbnail_url,
            preview_url: row.preview_url,
            full_url: row.full_url,
            original_url: row.original_url,
            width: row.width,
            height: row.height,
            category,
            photographer_name: row.photographer_name,
            photographer_url: row.photographer_url,
            source_url: row.source_url,
            description: row.description,
            tags,
            likes: row.likes,
            dominant_color: row.dominant_color,
            is_premium: row.is_premium,
            created_at,
            synced_at,
            viewed: row.viewed,
            is_cached: row.is_cached,
            local_cache_path: row.local_cache_path,
        })
    }
}
