//! Provider trait and the set of configured wallpaper providers.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::ProviderError;
use crate::models::{RawWallpaper, WallpaperCategory, WallpaperSource};

pub mod cdn_manifest;
pub(crate) mod http;
pub mod pexels;
pub mod pixabay;
pub mod unsplash;
pub mod wallhaven;

pub use cdn_manifest::CdnManifestProvider;
pub use pexels::PexelsProvider;
pub use pixabay::PixabayProvider;
pub use unsplash::UnsplashProvider;
pub use wallhaven::WallhavenProvider;

/// A single external wallpaper source.
///
/// Implementations only fetch: they never deduplicate, persist or retry.
#[async_trait]
pub trait WallpaperProvider: Send + Sync {
    /// Stable provider identifier used in logs.
    fn id(&self) -> &'static str;

    fn source(&self) -> WallpaperSource;

    /// Lower runs earlier in the configured order.
    fn priority(&self) -> u8;

    /// How long to leave the provider alone after a 429 without `Retry-After`,
    /// sized to the provider's quota window.
    fn rate_limit_cooldown(&self) -> Duration;

    /// Whether `fetch_page` honors the page cursor.
    fn is_paginated(&self) -> bool {
        true
    }

    /// Fetch one page of raw records for the given category.
    ///
    /// `page` is 1-based; `None` means the first page.
    async fn fetch_page(
        &self,
        category: WallpaperCategory,
        page: Option<u32>,
    ) -> Result<Vec<RawWallpaper>, ProviderError>;
}

/// Credentials and endpoints for the built-in providers.
///
/// A provider whose key is absent is not built.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub unsplash_access_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub pixabay_api_key: Option<String>,
    pub wallhaven_enabled: bool,
    pub wallhaven_api_key: Option<String>,
    pub manifest_url: Option<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            unsplash_access_key: None,
            pexels_api_key: None,
            pixabay_api_key: None,
            wallhaven_enabled: true,
            wallhaven_api_key: None,
            manifest_url: None,
        }
    }
}

fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build every provider that has the configuration it needs, sorted by priority.
pub fn build_providers(config: &ProvidersConfig) -> Vec<Arc<dyn WallpaperProvider>> {
    let mut providers: Vec<Arc<dyn WallpaperProvider>> = Vec::new();

    match configured(&config.unsplash_access_key) {
        Some(key) => providers.push(Arc::new(UnsplashProvider::new(key))),
        None => warn!("Unsplash access key not set; provider disabled"),
    }
    match configured(&config.pexels_api_key) {
        Some(key) => providers.push(Arc::new(PexelsProvider::new(key))),
        None => warn!("Pexels API key not set; provider disabled"),
    }
    if config.wallhaven_enabled {
        let key = configured(&config.wallhaven_api_key).map(str::to_string);
        providers.push(Arc::new(WallhavenProvider::new(key)));
    }
    match configured(&config.pixabay_api_key) {
        Some(key) => providers.push(Arc::new(PixabayProvider::new(key))),
        None => warn!("Pixabay API key not set; provider disabled"),
    }
    if let Some(url) = configured(&config.manifest_url) {
        providers.push(Arc::new(CdnManifestProvider::new(url)));
    }

    providers.sort_by_key(|provider| provider.priority());
    info!(
        "Configured wallpaper providers: {}",
        providers
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(", ")
    );
    providers
}
