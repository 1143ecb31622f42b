//! Periodic and on-demand triggering of sync passes.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::sync_backoff::{periodic_delay, retry_delay};
use super::sync_status_model::SyncResult;
use super::sync_traits::WallpaperSyncServiceTrait;
use crate::wallpapers::{prune_stale_wallpapers, WallpaperRepositoryTrait};

/// Shortest allowed periodic cadence.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default periodic cadence.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Maximum jitter added to each periodic interval.
pub const SYNC_INTERVAL_JITTER: Duration = Duration::from_secs(60);

/// Stand-in for platform constraints (network available, battery not low).
pub trait SyncPrecondition: Send + Sync {
    fn is_met(&self) -> bool;
}

/// Precondition that never blocks a pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl SyncPrecondition for AlwaysReady {
    fn is_met(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub jitter: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            jitter: SYNC_INTERVAL_JITTER,
            max_attempts: 3,
            retry_base_delay: Duration::from_secs(30),
            retry_max_delay: Duration::from_secs(10 * 60),
        }
    }
}

/// What a trigger ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed { new_count: usize, attempts: u32 },
    GaveUp { attempts: u32, last_error: String },
    /// The precondition was not met; no pass ran.
    Skipped,
}

struct Retention {
    repository: Arc<dyn WallpaperRepositoryTrait>,
    max_age: Duration,
}

struct SchedulerInner {
    service: Arc<dyn WallpaperSyncServiceTrait>,
    precondition: Arc<dyn SyncPrecondition>,
    config: SchedulerConfig,
    retention: Option<Retention>,
    immediate_pending: AtomicBool,
}

/// Drives `perform_sync` on a cadence and on demand, with bounded retries.
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>,
    periodic: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(service: Arc<dyn WallpaperSyncServiceTrait>, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                service,
                precondition: Arc::new(AlwaysReady),
                config,
                retention: None,
                immediate_pending: AtomicBool::new(false),
            }),
            periodic: Mutex::new(None),
        }
    }

    pub fn with_precondition(mut self, precondition: Arc<dyn SyncPrecondition>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.precondition = precondition,
            None => warn!("[Scheduler] Precondition ignored: scheduler already started"),
        }
        self
    }

    /// Prune uncached wallpapers older than `max_age` after each successful periodic pass.
    pub fn with_retention(
        mut self,
        repository: Arc<dyn WallpaperRepositoryTrait>,
        max_age: Duration,
    ) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.retention = Some(Retention {
                    repository,
                    max_age,
                })
            }
            None => warn!("[Scheduler] Retention ignored: scheduler already started"),
        }
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Run a pass, retrying failed passes up to `max_attempts` in total.
    pub async fn run_with_retry(&self) -> TriggerOutcome {
        self.inner.run_with_retry().await
    }

    /// Start the background loop. No-op when already running.
    pub fn start_periodic(&self) {
        let mut guard = self.periodic.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("[Scheduler] Periodic sync already running");
            return;
        }

        let inner = Arc::clone(&self.inner);
        info!(
            "[Scheduler] Starting periodic sync every {}s",
            inner.config.interval.max(MIN_SYNC_INTERVAL).as_secs()
        );
        *guard = Some(tokio::spawn(async move {
            loop {
                let delay = periodic_delay(
                    inner.config.interval,
                    MIN_SYNC_INTERVAL,
                    inner.config.jitter,
                );
                tokio::time::sleep(delay).await;

                if !inner.precondition.is_met() {
                    info!("[Scheduler] Sync precondition not met; skipping this tick");
                    continue;
                }

                if let TriggerOutcome::Completed { .. } = inner.run_with_retry().await {
                    inner.run_retention().await;
                }
            }
        }));
    }

    pub fn stop_periodic(&self) {
        let handle = self
            .periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("[Scheduler] Periodic sync stopped");
        }
    }

    pub fn is_periodic_running(&self) -> bool {
        self.periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Queue an immediate pass. Returns `None` if one is already queued or running.
    pub fn enqueue_immediate(&self) -> Option<JoinHandle<TriggerOutcome>> {
        if self
            .inner
            .immediate_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[Scheduler] Immediate sync already pending");
            return None;
        }

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            let _pending = PendingFlag(Arc::clone(&inner));
            if !inner.precondition.is_met() {
                info!("[Scheduler] Sync precondition not met; immediate sync skipped");
                return TriggerOutcome::Skipped;
            }
            inner.run_with_retry().await
        }))
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self
            .periodic
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Clears the immediate-pending flag when the queued task ends.
struct PendingFlag(Arc<SchedulerInner>);

impl Drop for PendingFlag {
    fn drop(&mut self) {
        self.0.immediate_pending.store(false, Ordering::Release);
    }
}

impl SchedulerInner {
    async fn run_with_retry(&self) -> TriggerOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.service.perform_sync().await {
                SyncResult::Success { new_count } => {
                    info!(
                        "[Scheduler] Sync completed on attempt {}: {} new wallpapers",
                        attempt, new_count
                    );
                    return TriggerOutcome::Completed {
                        new_count,
                        attempts: attempt,
                    };
                }
                SyncResult::Error { message, retryable }
                    if !retryable || attempt >= max_attempts =>
                {
                    if retryable {
                        error!(
                            "[Scheduler] Giving up after {} attempts: {}",
                            attempt, message
                        );
                    } else {
                        warn!(
                            "[Scheduler] Not retrying after attempt {}: {}",
                            attempt, message
                        );
                    }
                    return TriggerOutcome::GaveUp {
                        attempts: attempt,
                        last_error: message,
                    };
                }
                SyncResult::Error { message, .. } => {
                    let delay = retry_delay(
                        attempt,
                        self.config.retry_base_delay,
                        self.config.retry_max_delay,
                    );
                    warn!(
                        "[Scheduler] Attempt {} failed: {}. Retrying in {}s",
                        attempt,
                        message,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn run_retention(&self) {
        let Some(retention) = &self.retention else {
            return;
        };
        if let Err(e) =
            prune_stale_wallpapers(retention.repository.as_ref(), retention.max_age, Utc::now())
                .await
        {
            warn!("[Scheduler] Retention pass failed: {}", e);
        }
    }
}
