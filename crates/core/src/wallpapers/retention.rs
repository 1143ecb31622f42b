use chrono::{DateTime, Utc};
use log::info;
use std::time::Duration;

use super::wallpaper_traits::WallpaperRepositoryTrait;
use crate::errors::{Error, Result};

/// Deletes uncached wallpapers synced more than `max_age` before `now`.
pub async fn prune_stale_wallpapers(
    repository: &dyn WallpaperRepositoryTrait,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<usize> {
    let max_age = chrono::Duration::from_std(max_age)
        .map_err(|e| Error::Config(format!("Invalid retention window: {}", e)))?;
    let cutoff = now
        .checked_sub_signed(max_age)
        .ok_or_else(|| Error::Config("Retention window exceeds representable time".to_string()))?;

    let removed = repository.delete_uncached_before(cutoff).await?;
    if removed > 0 {
        info!(
            "[Retention] Pruned {} uncached wallpapers synced before {}",
            removed,
            cutoff.to_rfc3339()
        );
    }
    Ok(removed)
}
