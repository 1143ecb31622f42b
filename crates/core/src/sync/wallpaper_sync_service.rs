//! Sync orchestrator: one pass across every configured provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use wallsync_providers::{
    ProviderError, RawWallpaper, RetryClass, WallpaperCategory, WallpaperProvider,
    WallpaperSource,
};

use super::sync_status_model::{
    PassOutcome, SyncResult, SyncStatus, PASS_STATUS_ERROR, PASS_STATUS_SUCCESS,
};
use super::sync_status_tracker::SyncStatusTracker;
use super::sync_traits::WallpaperSyncServiceTrait;
use crate::errors::{Error, Result};
use crate::wallpapers::{normalize, CanonicalWallpaper, WallpaperRepositoryTrait};

/// Upper bound on a single provider fetch, on top of the client's own timeout.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest a rate-limited provider is left alone, whatever it asks for.
pub const MAX_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// One (provider, category) query issued per pass.
#[derive(Clone)]
pub struct SyncTarget {
    pub provider: Arc<dyn WallpaperProvider>,
    pub category: WallpaperCategory,
}

impl SyncTarget {
    pub fn new(provider: Arc<dyn WallpaperProvider>, category: WallpaperCategory) -> Self {
        Self { provider, category }
    }

    /// One target per provider, all querying `category`.
    pub fn for_providers(
        providers: Vec<Arc<dyn WallpaperProvider>>,
        category: WallpaperCategory,
    ) -> Vec<Self> {
        providers
            .into_iter()
            .map(|provider| Self::new(provider, category))
            .collect()
    }

    fn source(&self) -> WallpaperSource {
        self.provider.source()
    }
}

type SharedPass = Shared<BoxFuture<'static, SyncResult>>;
type PassSlot = Arc<Mutex<Option<SharedPass>>>;

/// Runs sync passes with single-flight semantics.
///
/// Concurrent `perform_sync` callers share one pass and receive the same
/// result. A pass runs on its own task and completes even if every caller
/// goes away.
pub struct WallpaperSyncService {
    pass: Arc<SyncPass>,
    in_flight: PassSlot,
}

impl WallpaperSyncService {
    pub fn new(
        targets: Vec<SyncTarget>,
        wallpaper_repository: Arc<dyn WallpaperRepositoryTrait>,
        status: Arc<SyncStatusTracker>,
        provider_timeout: Duration,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut unique_targets = Vec::with_capacity(targets.len());
        for target in targets {
            if seen.insert(target.source()) {
                unique_targets.push(target);
            } else {
                warn!(
                    "[WallpaperSync] Ignoring duplicate target for source {}",
                    target.source()
                );
            }
        }
        unique_targets.sort_by_key(|target| target.provider.priority());

        Self {
            pass: Arc::new(SyncPass {
                targets: unique_targets,
                wallpaper_repository,
                status,
                provider_timeout,
                cooldowns: Mutex::new(HashMap::new()),
            }),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn targets(&self) -> &[SyncTarget] {
        &self.pass.targets
    }

    /// Joins the pass in flight, or starts one. Check and claim happen under one lock.
    fn claim_or_join(&self) -> SharedPass {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            debug!("[WallpaperSync] Pass already in flight; joining it");
            return existing.clone();
        }

        let pass = Arc::clone(&self.pass);
        let release = SlotRelease(Arc::clone(&self.in_flight));
        let handle = tokio::spawn(async move {
            let _release = release;
            pass.run().await
        });

        let shared = async move {
            handle.await.unwrap_or_else(|e| SyncResult::Error {
                message: format!("sync pass aborted: {}", e),
                retryable: true,
            })
        }
        .boxed()
        .shared();
        *slot = Some(shared.clone());
        shared
    }
}

/// Empties the single-flight slot when the pass task ends, however it ends.
struct SlotRelease(PassSlot);

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[async_trait]
impl WallpaperSyncServiceTrait for WallpaperSyncService {
    async fn perform_sync(&self) -> SyncResult {
        self.claim_or_join().await
    }

    fn status(&self) -> SyncStatus {
        self.pass.status.current()
    }

    fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.pass.status.subscribe()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pass execution
// ─────────────────────────────────────────────────────────────────────────────

struct SyncPass {
    targets: Vec<SyncTarget>,
    wallpaper_repository: Arc<dyn WallpaperRepositoryTrait>,
    status: Arc<SyncStatusTracker>,
    provider_timeout: Duration,
    /// Rate-limited sources and when they may be queried again.
    cooldowns: Mutex<HashMap<WallpaperSource, Instant>>,
}

struct PassReport {
    outcome: PassOutcome,
    succeeded: Vec<WallpaperSource>,
    cursor_updates: Vec<(WallpaperSource, u32)>,
    synced_at: DateTime<Utc>,
}

impl PassReport {
    fn failed(message: String, retryable: bool, synced_at: DateTime<Utc>) -> Self {
        Self {
            outcome: PassOutcome::TotalFailure { message, retryable },
            succeeded: Vec::new(),
            cursor_updates: Vec::new(),
            synced_at,
        }
    }

    fn apply(self, status: &mut SyncStatus, duration_ms: i64) {
        status.is_syncing = false;
        status.last_pass_duration_ms = Some(duration_ms);

        match self.outcome {
            PassOutcome::TotalFailure { message, .. } => {
                status.last_error = Some(message);
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                status.last_pass_status = Some(PASS_STATUS_ERROR.to_string());
            }
            PassOutcome::Success { new_count } | PassOutcome::PartialSuccess { new_count, .. } => {
                let new_count = i64::try_from(new_count).unwrap_or(i64::MAX);
                status.last_sync_at = Some(self.synced_at);
                status.last_sync_source = Some(
                    self.succeeded
                        .iter()
                        .map(|source| source.as_str())
                        .collect::<Vec<_>>()
                        .join(","),
                );
                status.last_sync_count = new_count;
                status.total_synced = status.total_synced.saturating_add(new_count);
                status.last_error = None;
                status.consecutive_failures = 0;
                status.last_pass_status = Some(PASS_STATUS_SUCCESS.to_string());
                for (source, next_page) in self.cursor_updates {
                    status.cursors.insert(source, next_page);
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// False when retrying right away cannot change the answer.
fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Provider(ProviderError::RateLimited { .. }) => false,
        Error::Provider(provider_error) => provider_error.retry_class() == RetryClass::Retryable,
        _ => true,
    }
}

/// One timestamp per pass, never earlier than the previous pass's.
fn pass_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(previous) if previous > now => previous,
        _ => now,
    }
}

impl SyncPass {
    async fn run(&self) -> SyncResult {
        let started = Instant::now();
        info!(
            "[WallpaperSync] Starting pass across {} targets",
            self.targets.len()
        );
        if let Err(e) = self.status.update(|status| status.is_syncing = true).await {
            warn!("[WallpaperSync] Could not record pass start: {}", e);
        }

        let report = match AssertUnwindSafe(self.execute()).catch_unwind().await {
            Ok(report) => report,
            Err(payload) => {
                let message = format!("sync pass aborted: {}", panic_message(payload.as_ref()));
                error!("[WallpaperSync] {}", message);
                PassReport::failed(message, true, Utc::now())
            }
        };

        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        let result = report.outcome.as_result();
        match &report.outcome {
            PassOutcome::Success { new_count } => {
                info!(
                    "[WallpaperSync] Pass succeeded: {} new wallpapers in {}ms",
                    new_count, duration_ms
                );
            }
            PassOutcome::PartialSuccess { new_count, failed } => {
                warn!(
                    "[WallpaperSync] Pass partially succeeded: {} new, failed sources: {}",
                    new_count,
                    failed
                        .iter()
                        .map(|source| source.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                );
            }
            PassOutcome::TotalFailure { message, .. } => {
                error!("[WallpaperSync] Pass failed: {}", message);
            }
        }

        if let Err(e) = self
            .status
            .update(|status| report.apply(status, duration_ms))
            .await
        {
            error!("[WallpaperSync] Could not record pass result: {}", e);
        }
        result
    }

    async fn execute(&self) -> PassReport {
        let snapshot = self.status.current();
        let synced_at = pass_timestamp(snapshot.last_sync_at);

        if self.targets.is_empty() {
            return PassReport::failed(
                "No wallpaper sources configured".to_string(),
                false,
                synced_at,
            );
        }

        let fetched = join_all(
            self.targets
                .iter()
                .map(|target| self.fetch_target(target, &snapshot)),
        )
        .await;

        let mut new_count = 0_usize;
        let mut succeeded = Vec::new();
        let mut failures: Vec<(WallpaperSource, String, bool)> = Vec::new();
        let mut cursor_updates = Vec::new();

        for (target, page, fetch_result) in fetched {
            let source = target.source();
            let result = match fetch_result {
                Ok(records) => {
                    let fetched_count = records.len();
                    self.persist(target, records, synced_at)
                        .await
                        .map(|inserted| (fetched_count, inserted))
                }
                Err(e) => Err(e),
            };

            match result {
                Ok((fetched_count, inserted)) => {
                    debug!(
                        "[WallpaperSync] {}: fetched {}, inserted {}",
                        source, fetched_count, inserted
                    );
                    new_count += inserted;
                    succeeded.push(source);
                    if let Some(page) = page {
                        let next_page = if fetched_count == 0 {
                            1
                        } else {
                            page.saturating_add(1)
                        };
                        cursor_updates.push((source, next_page));
                    }
                }
                Err(e) => {
                    match &e {
                        Error::Provider(provider_error)
                            if provider_error.retry_class() == RetryClass::ReauthRequired =>
                        {
                            error!(
                                "[WallpaperSync] {} rejected the configured credentials: {}",
                                source, e
                            );
                        }
                        _ => warn!("[WallpaperSync] {} failed: {}", source, e),
                    }
                    let retryable = is_retryable(&e);
                    failures.push((source, e.to_string(), retryable));
                }
            }
        }

        let outcome = if succeeded.is_empty() {
            let reasons = failures
                .iter()
                .map(|(source, reason, _)| format!("{}: {}", source, reason))
                .collect::<Vec<_>>()
                .join("; ");
            PassOutcome::TotalFailure {
                message: format!("All sources failed: {}", reasons),
                retryable: failures.iter().any(|(_, _, retryable)| *retryable),
            }
        } else if failures.is_empty() {
            PassOutcome::Success { new_count }
        } else {
            PassOutcome::PartialSuccess {
                new_count,
                failed: failures.into_iter().map(|(source, _, _)| source).collect(),
            }
        };

        PassReport {
            outcome,
            succeeded,
            cursor_updates,
            synced_at,
        }
    }

    async fn fetch_target<'a>(
        &self,
        target: &'a SyncTarget,
        snapshot: &SyncStatus,
    ) -> (&'a SyncTarget, Option<u32>, Result<Vec<RawWallpaper>>) {
        let page = target
            .provider
            .is_paginated()
            .then(|| snapshot.cursor_for(target.source()));

        if let Some(remaining) = self.cooldown_remaining(target.source()) {
            debug!(
                "[WallpaperSync] {} is rate limited for another {}s; skipping",
                target.source(),
                remaining.as_secs()
            );
            let error = ProviderError::RateLimited {
                retry_after_secs: Some(remaining.as_secs().max(1)),
            };
            return (target, page, Err(Error::from(error)));
        }

        let result = match tokio::time::timeout(
            self.provider_timeout,
            target.provider.fetch_page(target.category, page),
        )
        .await
        {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(e)) => Err(Error::from(e)),
            Err(_) => Err(Error::from(ProviderError::Timeout(self.provider_timeout))),
        };
        if let Err(Error::Provider(ProviderError::RateLimited { retry_after_secs })) = &result {
            self.start_cooldown(target, *retry_after_secs);
        }
        (target, page, result)
    }

    fn cooldown_remaining(&self, source: WallpaperSource) -> Option<Duration> {
        let mut cooldowns = self.cooldowns.lock().unwrap_or_else(PoisonError::into_inner);
        let until = *cooldowns.get(&source)?;
        let now = Instant::now();
        if until > now {
            Some(until - now)
        } else {
            cooldowns.remove(&source);
            None
        }
    }

    fn start_cooldown(&self, target: &SyncTarget, retry_after_secs: Option<u64>) {
        let cooldown = retry_after_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| target.provider.rate_limit_cooldown())
            .min(MAX_RATE_LIMIT_COOLDOWN);
        warn!(
            "[WallpaperSync] {} is rate limited; pausing it for {}s",
            target.source(),
            cooldown.as_secs()
        );
        self.cooldowns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.source(), Instant::now() + cooldown);
    }

    /// Normalize, filter against the store, insert. Returns the inserted count.
    async fn persist(
        &self,
        target: &SyncTarget,
        records: Vec<RawWallpaper>,
        synced_at: DateTime<Utc>,
    ) -> Result<usize> {
        let source = target.source();
        let candidates: Vec<CanonicalWallpaper> = records
            .into_iter()
            .map(|raw| normalize(raw, target.category, synced_at))
            .filter(|wallpaper| {
                if wallpaper.source_local_id.is_empty() {
                    warn!("[WallpaperSync] Skipping {} record without an id", source);
                    return false;
                }
                if !wallpaper.has_image() {
                    warn!(
                        "[WallpaperSync] Skipping {} record {}: no image URL",
                        source, wallpaper.source_local_id
                    );
                    return false;
                }
                true
            })
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        let local_ids: Vec<String> = candidates
            .iter()
            .map(|wallpaper| wallpaper.source_local_id.clone())
            .collect();
        let existing = self
            .wallpaper_repository
            .existing_source_ids(source, &local_ids)?;
        let fresh: Vec<CanonicalWallpaper> = candidates
            .into_iter()
            .filter(|wallpaper| !existing.contains(&wallpaper.source_local_id))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let outcomes = self.wallpaper_repository.insert_many(fresh).await?;
        Ok(outcomes.iter().filter(|outcome| outcome.is_inserted()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncStatusRepositoryTrait;
    use crate::wallpapers::{InMemoryWallpaperStore, InsertOutcome};
    use crate::DatabaseError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type FetchResult = std::result::Result<Vec<RawWallpaper>, ProviderError>;
    type Responder = Box<dyn Fn(Option<u32>) -> FetchResult + Send + Sync>;

    struct ScriptedProvider {
        source: WallpaperSource,
        paginated: bool,
        delay: Option<Duration>,
        responder: Responder,
        calls: AtomicUsize,
        pages: Mutex<Vec<Option<u32>>>,
    }

    impl ScriptedProvider {
        fn new(source: WallpaperSource, responder: Responder) -> Self {
            Self {
                source,
                paginated: source != WallpaperSource::Cdn,
                delay: None,
                responder,
                calls: AtomicUsize::new(0),
                pages: Mutex::new(Vec::new()),
            }
        }

        fn returning(source: WallpaperSource, ids: &[&str]) -> Self {
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            Self::new(
                source,
                Box::new(move |_: Option<u32>| Ok(ids.iter().map(|id| raw(source, id)).collect())),
            )
        }

        fn failing(source: WallpaperSource, status: u16) -> Self {
            Self::new(
                source,
                Box::new(move |_: Option<u32>| {
                    Err(ProviderError::api(status, "upstream unavailable"))
                }),
            )
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn requested_pages(&self) -> Vec<Option<u32>> {
            self.pages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WallpaperProvider for ScriptedProvider {
        fn id(&self) -> &'static str {
            "SCRIPTED"
        }

        fn source(&self) -> WallpaperSource {
            self.source
        }

        fn priority(&self) -> u8 {
            WallpaperSource::ALL
                .iter()
                .position(|s| *s == self.source)
                .unwrap_or_default() as u8
        }

        fn rate_limit_cooldown(&self) -> Duration {
            Duration::from_secs(60)
        }

        fn is_paginated(&self) -> bool {
            self.paginated
        }

        async fn fetch_page(
            &self,
            _category: WallpaperCategory,
            page: Option<u32>,
        ) -> std::result::Result<Vec<RawWallpaper>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages.lock().unwrap().push(page);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.responder)(page)
        }
    }

    fn raw(source: WallpaperSource, id: &str) -> RawWallpaper {
        let url = format!("https://img.example/{}/{}.jpg", source, id);
        match source {
            WallpaperSource::Unsplash => RawWallpaper::Unsplash(
                serde_json::from_value(serde_json::json!({"id": id, "urls": {"full": url}}))
                    .unwrap(),
            ),
            WallpaperSource::Pexels => RawWallpaper::Pexels(
                serde_json::from_value(serde_json::json!({
                    "id": id.parse::<u64>().unwrap(),
                    "src": {"large2x": url}
                }))
                .unwrap(),
            ),
            WallpaperSource::Wallhaven => RawWallpaper::Wallhaven(
                serde_json::from_value(serde_json::json!({"id": id, "path": url})).unwrap(),
            ),
            WallpaperSource::Pixabay => RawWallpaper::Pixabay(
                serde_json::from_value(serde_json::json!({
                    "id": id.parse::<u64>().unwrap(),
                    "largeImageURL": url
                }))
                .unwrap(),
            ),
            WallpaperSource::Cdn => RawWallpaper::Cdn(
                serde_json::from_value(serde_json::json!({"id": id, "image": url})).unwrap(),
            ),
        }
    }

    async fn build_service(
        providers: Vec<Arc<dyn WallpaperProvider>>,
        wallpapers: Arc<dyn WallpaperRepositoryTrait>,
        statuses: Arc<dyn SyncStatusRepositoryTrait>,
    ) -> WallpaperSyncService {
        let tracker = Arc::new(SyncStatusTracker::new(statuses).await.unwrap());
        WallpaperSyncService::new(
            SyncTarget::for_providers(providers, WallpaperCategory::New),
            wallpapers,
            tracker,
            DEFAULT_PROVIDER_TIMEOUT,
        )
    }

    async fn memory_service(
        providers: Vec<Arc<dyn WallpaperProvider>>,
        store: &Arc<InMemoryWallpaperStore>,
    ) -> WallpaperSyncService {
        build_service(providers, store.clone(), store.clone()).await
    }

    /// Store whose inserts always report `Duplicate`, as if another writer won the race.
    struct RacingStore(InMemoryWallpaperStore);

    #[async_trait]
    impl WallpaperRepositoryTrait for RacingStore {
        fn existing_source_ids(
            &self,
            source: WallpaperSource,
            source_local_ids: &[String],
        ) -> Result<HashSet<String>> {
            self.0.existing_source_ids(source, source_local_ids)
        }

        async fn insert_many(
            &self,
            wallpapers: Vec<CanonicalWallpaper>,
        ) -> Result<Vec<InsertOutcome>> {
            Ok(wallpapers
                .into_iter()
                .map(|w| InsertOutcome::Duplicate(w.id))
                .collect())
        }

        fn get_wallpaper(&self, wallpaper_id: &str) -> Result<Option<CanonicalWallpaper>> {
            self.0.get_wallpaper(wallpaper_id)
        }

        fn list_wallpapers(
            &self,
            category: Option<WallpaperCategory>,
            limit: i64,
        ) -> Result<Vec<CanonicalWallpaper>> {
            self.0.list_wallpapers(category, limit)
        }

        fn count_wallpapers(&self) -> Result<i64> {
            self.0.count_wallpapers()
        }

        async fn mark_viewed(&self, wallpaper_id: String) -> Result<bool> {
            self.0.mark_viewed(wallpaper_id).await
        }

        async fn update_cache_state(
            &self,
            wallpaper_id: String,
            local_cache_path: Option<String>,
        ) -> Result<bool> {
            self.0.update_cache_state(wallpaper_id, local_cache_path).await
        }

        async fn delete_uncached_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
            self.0.delete_uncached_before(cutoff).await
        }
    }

    /// Store that rejects inserts for one source.
    struct FailingSourceStore {
        inner: InMemoryWallpaperStore,
        failing: WallpaperSource,
    }

    #[async_trait]
    impl WallpaperRepositoryTrait for FailingSourceStore {
        fn existing_source_ids(
            &self,
            source: WallpaperSource,
            source_local_ids: &[String],
        ) -> Result<HashSet<String>> {
            self.inner.existing_source_ids(source, source_local_ids)
        }

        async fn insert_many(
            &self,
            wallpapers: Vec<CanonicalWallpaper>,
        ) -> Result<Vec<InsertOutcome>> {
            if wallpapers.iter().any(|w| w.source == self.failing) {
                return Err(DatabaseError::QueryFailed("database is locked".to_string()).into());
            }
            self.inner.insert_many(wallpapers).await
        }

        fn get_wallpaper(&self, wallpaper_id: &str) -> Result<Option<CanonicalWallpaper>> {
            self.inner.get_wallpaper(wallpaper_id)
        }

        fn list_wallpapers(
            &self,
            category: Option<WallpaperCategory>,
            limit: i64,
        ) -> Result<Vec<CanonicalWallpaper>> {
            self.inner.list_wallpapers(category, limit)
        }

        fn count_wallpapers(&self) -> Result<i64> {
            self.inner.count_wallpapers()
        }

        async fn mark_viewed(&self, wallpaper_id: String) -> Result<bool> {
            self.inner.mark_viewed(wallpaper_id).await
        }

        async fn update_cache_state(
            &self,
            wallpaper_id: String,
            local_cache_path: Option<String>,
        ) -> Result<bool> {
            self.inner
                .update_cache_state(wallpaper_id, local_cache_path)
                .await
        }

        async fn delete_uncached_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
            self.inner.delete_uncached_before(cutoff).await
        }
    }

    #[tokio::test]
    async fn second_pass_with_unchanged_data_inserts_nothing() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let service = memory_service(
            vec![
                Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1", "u2"])),
                Arc::new(ScriptedProvider::returning(WallpaperSource::Cdn, &["c1"])),
            ],
            &store,
        )
        .await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 3 });
        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 0 });
        assert_eq!(store.count_wallpapers().unwrap(), 3);

        let status = service.status();
        assert_eq!(status.last_sync_count, 0);
        assert_eq!(status.total_synced, 3);
        assert_eq!(status.last_sync_source.as_deref(), Some("unsplash,cdn"));
    }

    #[tokio::test]
    async fn previously_synced_wallpaper_is_not_counted_again() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        store
            .insert_many(vec![normalize(
                raw(WallpaperSource::Unsplash, "u1"),
                WallpaperCategory::New,
                Utc::now(),
            )])
            .await
            .unwrap();

        let service = memory_service(
            vec![Arc::new(ScriptedProvider::returning(
                WallpaperSource::Unsplash,
                &["u1", "u2"],
            ))],
            &store,
        )
        .await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 1 });
        assert_eq!(store.count_wallpapers().unwrap(), 2);
        assert!(store.get_wallpaper("unsplash_u2").unwrap().is_some());
    }

    #[tokio::test]
    async fn total_failure_names_every_source() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let service = memory_service(
            vec![
                Arc::new(ScriptedProvider::failing(WallpaperSource::Unsplash, 503)),
                Arc::new(ScriptedProvider::failing(WallpaperSource::Pexels, 401)),
            ],
            &store,
        )
        .await;

        let result = service.perform_sync().await;
        let message = match result {
            SyncResult::Error { message, retryable } => {
                assert!(retryable);
                message
            }
            other => panic!("expected error, got {other:?}"),
        };
        assert!(message.starts_with("All sources failed: "));
        assert!(message.contains("unsplash: API error (503)"));
        assert!(message.contains("pexels: API error (401)"));

        let status = service.status();
        assert_eq!(status.last_error.as_deref(), Some(message.as_str()));
        assert!(!status.is_syncing);
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(status.last_pass_status.as_deref(), Some("error"));
        assert!(status.last_sync_at.is_none());
        assert_eq!(store.get_sync_status().unwrap(), status);
    }

    #[tokio::test]
    async fn one_failing_source_still_succeeds() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let pexels = Arc::new(ScriptedProvider::failing(WallpaperSource::Pexels, 500));
        let service = memory_service(
            vec![
                Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"])),
                pexels.clone(),
                Arc::new(ScriptedProvider::returning(WallpaperSource::Wallhaven, &["w1", "w2"])),
                Arc::new(ScriptedProvider::returning(WallpaperSource::Cdn, &["c1"])),
            ],
            &store,
        )
        .await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 4 });

        let status = service.status();
        assert!(status.last_error.is_none());
        assert_eq!(status.last_sync_source.as_deref(), Some("unsplash,wallhaven,cdn"));
        assert_eq!(status.cursors.get(&WallpaperSource::Unsplash), Some(&2));
        assert_eq!(status.cursors.get(&WallpaperSource::Wallhaven), Some(&2));
        assert_eq!(status.cursors.get(&WallpaperSource::Pexels), None);
        assert_eq!(status.cursors.get(&WallpaperSource::Cdn), None);
        assert_eq!(pexels.requested_pages(), vec![Some(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_share_a_single_pass() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let unsplash = Arc::new(
            ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1", "u2"])
                .with_delay(Duration::from_millis(200)),
        );
        let wallhaven = Arc::new(
            ScriptedProvider::returning(WallpaperSource::Wallhaven, &["w1"])
                .with_delay(Duration::from_millis(300)),
        );
        let service = memory_service(vec![unsplash.clone(), wallhaven.clone()], &store).await;

        let (first, second) = tokio::join!(service.perform_sync(), service.perform_sync());
        assert_eq!(first, SyncResult::Success { new_count: 3 });
        assert_eq!(first, second);
        assert_eq!(unsplash.calls(), 1);
        assert_eq!(wallhaven.calls(), 1);

        // The slot is released once the pass finishes.
        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 0 });
        assert_eq!(unsplash.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pass_completes_after_caller_is_dropped() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let unsplash = Arc::new(
            ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"])
                .with_delay(Duration::from_secs(1)),
        );
        let service = memory_service(vec![unsplash.clone()], &store).await;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), service.perform_sync()).await;
        assert!(abandoned.is_err());

        let mut receiver = service.subscribe_status();
        receiver.wait_for(|status| status.total_synced == 1).await.unwrap();
        assert_eq!(store.count_wallpapers().unwrap(), 1);
        assert_eq!(unsplash.calls(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_outcomes_are_not_counted() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let racing = Arc::new(RacingStore(InMemoryWallpaperStore::new()));
        let service = build_service(
            vec![Arc::new(ScriptedProvider::returning(
                WallpaperSource::Unsplash,
                &["u1", "u2"],
            ))],
            racing,
            store.clone(),
        )
        .await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 0 });
        assert_eq!(service.status().total_synced, 0);
    }

    #[tokio::test]
    async fn unparseable_date_is_stored_without_created_at() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let provider = ScriptedProvider::new(
            WallpaperSource::Wallhaven,
            Box::new(|_: Option<u32>| {
                Ok(vec![RawWallpaper::Wallhaven(
                    serde_json::from_value(serde_json::json!({
                        "id": "w1",
                        "path": "https://w.wallhaven.cc/full/w1.jpg",
                        "dimension_x": 1440,
                        "created_at": "not a date"
                    }))
                    .unwrap(),
                )])
            }),
        );
        let service = memory_service(vec![Arc::new(provider)], &store).await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 1 });
        let row = store.get_wallpaper("wallhaven_w1").unwrap().unwrap();
        assert_eq!(row.created_at, None);
        assert_eq!(row.width, 1440);
        assert_eq!(row.full_url, "https://w.wallhaven.cc/full/w1.jpg");
    }

    #[tokio::test]
    async fn cursor_advances_and_resets_at_end_of_feed() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let provider = Arc::new(ScriptedProvider::new(
            WallpaperSource::Wallhaven,
            Box::new(|page: Option<u32>| match page {
                Some(1) => Ok(vec![raw(WallpaperSource::Wallhaven, "p1")]),
                Some(2) => Ok(vec![raw(WallpaperSource::Wallhaven, "p2")]),
                _ => Ok(Vec::new()),
            }),
        ));
        let service = memory_service(vec![provider.clone()], &store).await;

        service.perform_sync().await;
        assert_eq!(service.status().cursor_for(WallpaperSource::Wallhaven), 2);
        service.perform_sync().await;
        assert_eq!(service.status().cursor_for(WallpaperSource::Wallhaven), 3);
        service.perform_sync().await;
        assert_eq!(service.status().cursor_for(WallpaperSource::Wallhaven), 1);

        assert_eq!(provider.requested_pages(), vec![Some(1), Some(2), Some(3)]);
        assert_eq!(store.count_wallpapers().unwrap(), 2);
    }

    #[tokio::test]
    async fn unpaginated_source_is_fetched_without_page() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let cdn = Arc::new(ScriptedProvider::returning(WallpaperSource::Cdn, &["c1"]));
        let service = memory_service(vec![cdn.clone()], &store).await;

        service.perform_sync().await;
        assert_eq!(cdn.requested_pages(), vec![None]);
        assert!(service.status().cursors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_provider_times_out_as_a_failure() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let service = memory_service(
            vec![
                Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"])),
                Arc::new(
                    ScriptedProvider::returning(WallpaperSource::Pexels, &["1"])
                        .with_delay(Duration::from_secs(3600)),
                ),
            ],
            &store,
        )
        .await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 1 });
        assert_eq!(service.status().last_sync_source.as_deref(), Some("unsplash"));
        assert!(store.get_wallpaper("pexels_1").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn all_sources_timing_out_reports_timeouts() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let service = memory_service(
            vec![Arc::new(
                ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"])
                    .with_delay(Duration::from_secs(3600)),
            )],
            &store,
        )
        .await;

        assert_eq!(
            service.perform_sync().await,
            SyncResult::Error {
                message: "All sources failed: unsplash: Request timed out after 30s".to_string(),
                retryable: true,
            }
        );
    }

    #[tokio::test]
    async fn panicking_provider_still_releases_syncing_flag() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let provider = ScriptedProvider::new(
            WallpaperSource::Unsplash,
            Box::new(
                |_: Option<u32>| -> std::result::Result<Vec<RawWallpaper>, ProviderError> {
                    panic!("malformed payload")
                },
            ),
        );
        let service = memory_service(vec![Arc::new(provider)], &store).await;

        let result = service.perform_sync().await;
        assert_eq!(
            result,
            SyncResult::Error {
                message: "sync pass aborted: malformed payload".to_string(),
                retryable: true,
            }
        );
        let status = service.status();
        assert!(!status.is_syncing);
        assert_eq!(status.last_error.as_deref(), Some("sync pass aborted: malformed payload"));
        assert!(!store.get_sync_status().unwrap().is_syncing);
    }

    #[tokio::test]
    async fn records_without_images_are_skipped() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let provider = ScriptedProvider::new(
            WallpaperSource::Cdn,
            Box::new(|_: Option<u32>| {
                Ok(vec![
                    raw(WallpaperSource::Cdn, "good"),
                    RawWallpaper::Cdn(
                        serde_json::from_value(serde_json::json!({"id": "blank"})).unwrap(),
                    ),
                ])
            }),
        );
        let service = memory_service(vec![Arc::new(provider)], &store).await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 1 });
        assert!(store.get_wallpaper("cdn_blank").unwrap().is_none());
    }

    #[tokio::test]
    async fn persistence_error_fails_only_that_source() {
        let statuses = Arc::new(InMemoryWallpaperStore::new());
        let wallpapers = Arc::new(FailingSourceStore {
            inner: InMemoryWallpaperStore::new(),
            failing: WallpaperSource::Pexels,
        });
        let service = build_service(
            vec![
                Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"])),
                Arc::new(ScriptedProvider::returning(WallpaperSource::Pexels, &["7"])),
            ],
            wallpapers.clone(),
            statuses,
        )
        .await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 1 });
        let status = service.status();
        assert_eq!(status.last_sync_source.as_deref(), Some("unsplash"));
        assert_eq!(status.cursors.get(&WallpaperSource::Pexels), None);
        assert_eq!(wallpapers.count_wallpapers().unwrap(), 1);
    }

    #[tokio::test]
    async fn no_targets_is_an_error() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let service = memory_service(Vec::new(), &store).await;
        assert_eq!(
            service.perform_sync().await,
            SyncResult::Error {
                message: "No wallpaper sources configured".to_string(),
                retryable: false,
            }
        );
    }

    #[tokio::test]
    async fn duplicate_sources_keep_first_target() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let first = Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"]));
        let second = Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u2"]));
        let service = memory_service(vec![first.clone(), second.clone()], &store).await;

        assert_eq!(service.targets().len(), 1);
        service.perform_sync().await;
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn records_without_an_id_are_skipped() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let provider = ScriptedProvider::new(
            WallpaperSource::Cdn,
            Box::new(|_: Option<u32>| {
                Ok(vec![
                    raw(WallpaperSource::Cdn, ""),
                    raw(WallpaperSource::Cdn, "   "),
                    raw(WallpaperSource::Cdn, "c9"),
                ])
            }),
        );
        let service = memory_service(vec![Arc::new(provider)], &store).await;

        assert_eq!(service.perform_sync().await, SyncResult::Success { new_count: 1 });
        assert!(store.get_wallpaper("cdn_").unwrap().is_none());
        assert_eq!(store.count_wallpapers().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_source_is_paused_until_retry_after() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let unsplash = Arc::new(ScriptedProvider::returning(WallpaperSource::Unsplash, &["u1"]));
        let pexels = Arc::new(ScriptedProvider::new(
            WallpaperSource::Pexels,
            Box::new(|_: Option<u32>| {
                Err(ProviderError::RateLimited {
                    retry_after_secs: Some(3600),
                })
            }),
        ));
        let service = memory_service(vec![unsplash.clone(), pexels.clone()], &store).await;

        for _ in 0..3 {
            assert!(service.perform_sync().await.is_success());
        }
        assert_eq!(unsplash.calls(), 3);
        assert_eq!(pexels.calls(), 1);
        assert_eq!(service.status().last_sync_source.as_deref(), Some("unsplash"));

        tokio::time::advance(Duration::from_secs(3601)).await;
        service.perform_sync().await;
        assert_eq!(pexels.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_retry_after_uses_provider_cooldown() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let pexels = Arc::new(ScriptedProvider::new(
            WallpaperSource::Pexels,
            Box::new(|_: Option<u32>| {
                Err(ProviderError::RateLimited {
                    retry_after_secs: None,
                })
            }),
        ));
        let service = memory_service(vec![pexels.clone()], &store).await;

        let result = service.perform_sync().await;
        assert!(matches!(result, SyncResult::Error { retryable: false, .. }));

        tokio::time::advance(Duration::from_secs(30)).await;
        let skipped = service.perform_sync().await;
        match skipped {
            SyncResult::Error { message, retryable } => {
                assert!(!retryable);
                assert!(message.contains("pexels: Rate limited"));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(pexels.calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        service.perform_sync().await;
        assert_eq!(pexels.calls(), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retryable() {
        let store = Arc::new(InMemoryWallpaperStore::new());
        let service = memory_service(
            vec![
                Arc::new(ScriptedProvider::failing(WallpaperSource::Unsplash, 401)),
                Arc::new(ScriptedProvider::failing(WallpaperSource::Pixabay, 400)),
            ],
            &store,
        )
        .await;

        let result = service.perform_sync().await;
        assert!(matches!(result, SyncResult::Error { retryable: false, .. }));
    }
}
