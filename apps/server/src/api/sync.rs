use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use wallsync_core::sync::{SyncStatus, TriggerOutcome};

use crate::main_lib::AppState;

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/status", get(get_sync_status))
        .route("/sync/trigger", post(trigger_sync))
}

async fn get_sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync_service.status())
}

/// Queues an immediate pass with retries. Returns 202 when queued, or 200
/// when a pass requested earlier has not finished yet.
async fn trigger_sync(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let Some(handle) = state.scheduler.enqueue_immediate() else {
        info!("[Api] Sync already pending; trigger ignored");
        return (StatusCode::OK, Json(json!({ "status": "already_pending" })));
    };

    info!("[Api] Immediate sync queued");
    tokio::spawn(async move {
        match handle.await {
            Ok(TriggerOutcome::Completed { new_count, attempts }) => info!(
                "[Api] Immediate sync completed: {} new after {} attempt(s)",
                new_count, attempts
            ),
            Ok(TriggerOutcome::GaveUp {
                attempts,
                last_error,
            }) => warn!(
                "[Api] Immediate sync gave up after {} attempt(s): {}",
                attempts, last_error
            ),
            Ok(TriggerOutcome::Skipped) => info!("[Api] Immediate sync skipped"),
            Err(e) => error!("[Api] Immediate sync task failed: {}", e),
        }
    });

    (StatusCode::ACCEPTED, Json(json!({ "status": "queued" })))
}
