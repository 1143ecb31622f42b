//! HTTP surface of the daemon, mounted under `/api/v1`.

mod sync;
mod wallpapers;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::main_lib::AppState;

pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/healthz", get(healthz))
        .merge(sync::router())
        .merge(wallpapers::router());

    Router::new().nest("/api/v1", api).with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use wallsync_core::sync::{
        SchedulerConfig, SyncScheduler, SyncStatusTracker, SyncTarget, WallpaperSyncService,
        DEFAULT_PROVIDER_TIMEOUT,
    };
    use wallsync_core::wallpapers::{CanonicalWallpaper, InMemoryWallpaperStore};

    use super::app_router;
    use crate::main_lib::AppState;

    /// Router over an in-memory store with no providers configured.
    pub(crate) async fn test_app(seed: Vec<CanonicalWallpaper>) -> (Router, Arc<AppState>) {
        let store = Arc::new(InMemoryWallpaperStore::with_wallpapers(seed));
        let tracker = Arc::new(SyncStatusTracker::new(store.clone()).await.unwrap());
        let targets: Vec<SyncTarget> = Vec::new();
        let service = Arc::new(WallpaperSyncService::new(
            targets,
            store.clone(),
            tracker,
            DEFAULT_PROVIDER_TIMEOUT,
        ));
        let scheduler = SyncScheduler::new(service.clone(), SchedulerConfig::default());
        let state = Arc::new(AppState {
            wallpaper_repository: store,
            sync_service: service,
            scheduler: Arc::new(scheduler),
        });
        (app_router(state.clone()), state)
    }

    pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub(crate) fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }
}
