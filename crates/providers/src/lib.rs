//! Wallsync provider clients.
//!
//! One client per external wallpaper API, all behind the `WallpaperProvider`
//! trait. Clients return raw provider records; normalization, deduplication
//! and persistence live in `wallsync-core`.

pub mod errors;
pub mod models;
pub mod provider;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{ProviderError, RetryClass};
pub use models::{RawWallpaper, WallpaperCategory, WallpaperSource};
pub use provider::{build_providers, ProvidersConfig, WallpaperProvider};
