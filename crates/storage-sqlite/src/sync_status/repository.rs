use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;

use wallsync_core::sync::{SyncStatus, SyncStatusRepositoryTrait};
use wallsync_core::Result;

use super::model::{SyncStatusDB, SYNC_STATUS_ROW_ID};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_status;
use crate::wallpapers::timestamp_to_db;

pub struct SyncStatusRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncStatusRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SyncStatusRepository { pool, writer }
    }
}

#[async_trait]
impl SyncStatusRepositoryTrait for SyncStatusRepository {
    fn get_sync_status(&self) -> Result<SyncStatus> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_status::table
            .find(SYNC_STATUS_ROW_ID)
            .first::<SyncStatusDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        match row {
            Some(row) => Ok(SyncStatus::try_from(row)?),
            None => Ok(SyncStatus::default()),
        }
    }

    async fn update_sync_status(&self, status: SyncStatus) -> Result<()> {
        let row = SyncStatusDB::from_domain(&status, timestamp_to_db(&Utc::now()))?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(sync_status::table)
                    .values(&row)
                    .on_conflict(sync_status::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
