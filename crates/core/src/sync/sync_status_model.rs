//! Sync status and pass result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wallsync_providers::WallpaperSource;

pub const PASS_STATUS_SUCCESS: &str = "success";
pub const PASS_STATUS_ERROR: &str = "error";

/// Persisted singleton describing the most recent sync activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Comma-separated source tags that succeeded in the last successful pass.
    pub last_sync_source: Option<String>,
    pub last_sync_count: i64,
    /// Cumulative rows inserted across all passes.
    pub total_synced: i64,
    pub last_error: Option<String>,
    /// Next page to request per paginated source.
    pub cursors: BTreeMap<WallpaperSource, u32>,
    pub consecutive_failures: i32,
    pub last_pass_duration_ms: Option<i64>,
    pub last_pass_status: Option<String>,
}

impl SyncStatus {
    /// Next page for `source`; the first page when no cursor is stored.
    pub fn cursor_for(&self, source: WallpaperSource) -> u32 {
        self.cursors.get(&source).copied().unwrap_or(1).max(1)
    }
}

/// Outcome of one `perform_sync` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncResult {
    Success {
        new_count: usize,
    },
    /// `retryable` is false when an immediate retry cannot help, e.g. every
    /// source is rate limited or rejected the request outright.
    Error {
        message: String,
        retryable: bool,
    },
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncResult::Success { .. })
    }
}

/// Terminal state of a pass, before it is reduced to a `SyncResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every target succeeded.
    Success { new_count: usize },
    /// At least one target succeeded and at least one failed.
    PartialSuccess {
        new_count: usize,
        failed: Vec<WallpaperSource>,
    },
    TotalFailure { message: String, retryable: bool },
}

impl PassOutcome {
    pub fn as_result(&self) -> SyncResult {
        match self {
            PassOutcome::Success { new_count } | PassOutcome::PartialSuccess { new_count, .. } => {
                SyncResult::Success {
                    new_count: *new_count,
                }
            }
            PassOutcome::TotalFailure { message, retryable } => SyncResult::Error {
                message: message.clone(),
                retryable: *retryable,
            },
        }
    }
}
