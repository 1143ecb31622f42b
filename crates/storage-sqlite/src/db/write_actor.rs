//! Single writer thread. Every write job runs in its own immediate transaction,
//! so writers never contend for the SQLite write lock.

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::sqlite::SqliteConnection;
use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::{mpsc, oneshot};

use wallsync_core::errors::{Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

const QUEUE_CAPACITY: usize = 256;

/// Handle to the writer thread. Cheap to clone.
#[derive(Clone)]
pub struct WriteHandle {
    sender: mpsc::Sender<Job>,
}

/// Error type inside the transaction: diesel must be able to roll back on
/// its own errors while job errors pass through untouched.
enum JobError {
    Diesel(diesel::result::Error),
    Core(Error),
}

impl From<diesel::result::Error> for JobError {
    fn from(err: diesel::result::Error) -> Self {
        JobError::Diesel(err)
    }
}

impl From<JobError> for Error {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Diesel(e) => StorageError::from(e).into(),
            JobError::Core(e) => e,
        }
    }
}

impl WriteHandle {
    /// Runs `job` on the writer connection inside an immediate transaction.
    /// A panicking job is rolled back and reported as a writer error.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel::<Result<T>>();
        let wrapped: Job = Box::new(move |conn: &mut SqliteConnection| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                conn.immediate_transaction::<T, JobError, _>(|tx| job(tx).map_err(JobError::Core))
            }));
            let result = match outcome {
                Ok(result) => result.map_err(Error::from),
                Err(_) => {
                    error!("Write job panicked, rolling back its transaction");
                    if let Err(e) = AnsiTransactionManager::rollback_transaction(conn) {
                        warn!("Rollback after panicked write job failed: {}", e);
                    }
                    Err(StorageError::Writer("write job panicked".to_string()).into())
                }
            };
            let _ = reply_tx.send(result);
        });

        self.sender
            .send(wrapped)
            .await
            .map_err(|_| StorageError::Writer("writer thread has stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| StorageError::Writer("writer dropped the job".to_string()))?
    }
}

/// Spawns the writer on a dedicated OS thread holding one pooled connection.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (sender, mut receiver) = mpsc::channel::<Job>(QUEUE_CAPACITY);

    std::thread::Builder::new()
        .name("wallsync-db-writer".to_string())
        .spawn(move || {
            let mut conn = match pool.get() {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Writer could not acquire a database connection: {}", e);
                    return;
                }
            };
            info!("Database writer started");
            while let Some(job) = receiver.blocking_recv() {
                job(&mut conn);
            }
            info!("Database writer stopped");
        })
        .map(|_| ())
        .unwrap_or_else(|e| error!("Failed to spawn database writer thread: {}", e));

    WriteHandle { sender }
}
