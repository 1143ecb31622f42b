use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use wallsync_core::wallpapers::CanonicalWallpaper;
use wallsync_providers::WallpaperCategory;

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
struct ListWallpapersQuery {
    category: Option<WallpaperCategory>,
    limit: Option<i64>,
}

pub(super) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallpapers", get(list_wallpapers))
        .route("/wallpapers/:id", get(get_wallpaper))
}

async fn list_wallpapers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListWallpapersQuery>,
) -> ApiResult<Json<Vec<CanonicalWallpaper>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIST_LIMIT
        )));
    }
    let wallpapers = state
        .wallpaper_repository
        .list_wallpapers(query.category, limit)?;
    Ok(Json(wallpapers))
}

async fn get_wallpaper(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CanonicalWallpaper>> {
    state
        .wallpaper_repository
        .get_wallpaper(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("wallpaper '{}' not found", id)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get, send, test_app};
    use axum::http::StatusCode;
    use chrono::{Duration, TimeZone, Utc};
    use wallsync_core::wallpapers::CanonicalWallpaper;
    use wallsync_providers::{WallpaperCategory, WallpaperSource};

    fn wallpaper(local_id: &str, category: WallpaperCategory, minutes: i64) -> CanonicalWallpaper {
        let synced_at =
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes);
        CanonicalWallpaper {
            id: CanonicalWallpaper::canonical_id(WallpaperSource::Unsplash, local_id),
            source_local_id: local_id.to_string(),
            source: WallpaperSource::Unsplash,
            thumbnail_url: format!("https://img.test/{}/t.jpg", local_id),
            preview_url: String::new(),
            full_url: format!("https://img.test/{}/f.jpg", local_id),
            original_url: String::new(),
            width: 1080,
            height: 1920,
            category,
            photographer_name: "Lee".to_string(),
            photographer_url: None,
            source_url: String::new(),
            description: String::new(),
            tags: Vec::new(),
            likes: 0,
            dominant_color: None,
            is_premium: false,
            created_at: None,
            synced_at,
            viewed: false,
            is_cached: false,
            local_cache_path: None,
        }
    }

    fn seed() -> Vec<CanonicalWallpaper> {
        vec![
            wallpaper("a", WallpaperCategory::New, 0),
            wallpaper("b", WallpaperCategory::Trending, 1),
            wallpaper("c", WallpaperCategory::New, 2),
        ]
    }

    #[tokio::test]
    async fn lists_newest_first_with_category_filter() {
        let (app, _) = test_app(seed()).await;

        let (status, body) = send(&app, get("/api/v1/wallpapers")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["unsplash_c", "unsplash_b", "unsplash_a"]);

        let (_, body) = send(&app, get("/api/v1/wallpapers?category=new&limit=1")).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "unsplash_c");
        assert_eq!(items[0]["sourceLocalId"], "c");
    }

    #[tokio::test]
    async fn rejects_bad_limits_and_unknown_categories() {
        let (app, _) = test_app(seed()).await;

        let (status, body) = send(&app, get("/api/v1/wallpapers?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit"));

        let (status, _) = send(&app, get("/api/v1/wallpapers?category=vintage")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn single_wallpaper_lookup() {
        let (app, _) = test_app(seed()).await;

        let (status, body) = send(&app, get("/api/v1/wallpapers/unsplash_b")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "trending");

        let (status, _) = send(&app, get("/api/v1/wallpapers/unsplash_zzz")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
