//! Database model for the singleton sync status row.

use diesel::prelude::*;
use log::warn;
use std::collections::BTreeMap;
use wallsync_core::sync::SyncStatus;
use wallsync_providers::WallpaperSource;

use crate::errors::StorageError;
use crate::wallpapers::{timestamp_from_db, timestamp_to_db};

pub const SYNC_STATUS_ROW_ID: i32 = 1;

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_status)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct SyncStatusDB {
    pub id: i32,
    pub is_syncing: bool,
    pub last_sync_at: Option<String>,
    pub last_sync_source: Option<String>,
    pub last_sync_count: i64,
    pub total_synced: i64,
    pub last_error: Option<String>,
    /// JSON object of source tag to next page.
    pub cursors: String,
    pub consecutive_failures: i32,
    pub last_pass_duration_ms: Option<i64>,
    pub last_pass_status: Option<String>,
    pub updated_at: String,
}

impl SyncStatusDB {
    pub fn from_domain(status: &SyncStatus, updated_at: String) -> Result<Self, StorageError> {
        let cursors: BTreeMap<&str, u32> = status
            .cursors
            .iter()
            .map(|(source, page)| (source.as_str(), *page))
            .collect();
        let cursors = serde_json::to_string(&cursors)
            .map_err(|e| StorageError::InvalidData(format!("cursors: {}", e)))?;
        Ok(SyncStatusDB {
            id: SYNC_STATUS_ROW_ID,
            is_syncing: status.is_syncing,
            last_sync_at: status.last_sync_at.as_ref().map(timestamp_to_db),
            last_sync_source: status.last_sync_source.clone(),
            last_sync_count: status.last_sync_count,
            total_synced: status.total_synced,
            last_error: status.last_error.clone(),
            cursors,
            consecutive_failures: status.consecutive_failures,
            last_pass_duration_ms: status.last_pass_duration_ms,
            last_pass_status: status.last_pass_status.clone(),
            updated_at,
        })
    }
}

impl TryFrom<SyncStatusDB> for SyncStatus {
    type Error = StorageError;

    fn try_from(row: SyncStatusDB) -> Result<Self, Self::Error> {
        let stored: BTreeMap<String, u32> = serde_json::from_str(&row.cursors)
            .map_err(|e| StorageError::InvalidData(format!("cursors: {}", e)))?;
        let mut cursors = BTreeMap::new();
        for (tag, page) in stored {
            match tag.parse::<WallpaperSource>() {
                Ok(source) => {
                    cursors.insert(source, page);
                }
                Err(e) => warn!("Dropping cursor for unknown source: {}", e),
            }
        }

        Ok(SyncStatus {
            is_syncing: row.is_syncing,
            last_sync_at: row
                .last_sync_at
                .as_deref()
                .map(timestamp_from_db)
                .transpose()?,
            last_sync_source: row.last_sync_source,
            last_sync_count: row.last_sync_count,
            total_synced: row.total_synced,
            last_error: row.last_error,
            cursors,
            consecutive_failures: row.consecutive_failures,
            last_pass_duration_ms: row.last_pass_duration_ms,
            last_pass_status: row.last_pass_status,
        })
    }
}
