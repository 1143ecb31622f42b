use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wallsync_providers::{WallpaperCategory, WallpaperSource};

/// A wallpaper in provider-independent form, as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalWallpaper {
    /// `"{source}_{source_local_id}"`; the sole dedup key.
    pub id: String,
    pub source_local_id: String,
    pub source: WallpaperSource,
    pub thumbnail_url: String,
    pub preview_url: String,
    pub full_url: String,
    pub original_url: String,
    pub width: i32,
    pub height: i32,
    pub category: WallpaperCategory,
    pub photographer_name: String,
    pub photographer_url: Option<String>,
    pub source_url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub dominant_color: Option<String>,
    pub is_premium: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub synced_at: DateTime<Utc>,
    pub viewed: bool,
    pub is_cached: bool,
    pub local_cache_path: Option<String>,
}

impl CanonicalWallpaper {
    pub fn canonical_id(source: WallpaperSource, source_local_id: &str) -> String {
        format!("{}_{}", source.as_str(), source_local_id)
    }

    /// True when at least one image URL survived normalization.
    pub fn has_image(&self) -> bool {
        [
            &self.thumbnail_url,
            &self.preview_url,
            &self.full_url,
            &self.original_url,
        ]
        .iter()
        .any(|url| !url.trim().is_empty())
    }
}

/// Result of inserting one record with insert-if-absent semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted(String),
    Duplicate(String),
}

impl InsertOutcome {
    pub fn id(&self) -> &str {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::Duplicate(id) => id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}
