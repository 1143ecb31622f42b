//! Canonical wallpapers: model, normalization, persistence contracts.

pub(crate) mod memory_repository;
mod normalizer;
mod retention;
mod wallpaper_model;
mod wallpaper_traits;

pub use memory_repository::InMemoryWallpaperStore;
pub use normalizer::{normalize, parse_provider_timestamp};
pub use retention::prune_stale_wallpapers;
pub use wallpaper_model::{CanonicalWallpaper, InsertOutcome};
pub use wallpaper_traits::WallpaperRepositoryTrait;
