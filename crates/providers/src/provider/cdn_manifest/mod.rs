//! CDN manifest provider.
//!
//! A static JSON manifest hosted on a CDN. The whole catalogue is one
//! document, so the page cursor is ignored.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::models::{string_or_number, RawWallpaper, WallpaperCategory, WallpaperSource};
use crate::provider::http::{build_client, fetch_json};
use crate::provider::WallpaperProvider;

const PROVIDER_ID: &str = "CDN";

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub image: Option<String>,
    pub thumb: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "isPro", default)]
    pub is_pro: bool,
}

pub struct CdnManifestProvider {
    client: Client,
    manifest_url: String,
}

impl CdnManifestProvider {
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            manifest_url: manifest_url.into(),
        }
    }
}

#[async_trait]
impl WallpaperProvider for CdnManifestProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source(&self) -> WallpaperSource {
        WallpaperSource::Cdn
    }

    fn priority(&self) -> u8 {
        50
    }

    fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    fn is_paginated(&self) -> bool {
        false
    }

    async fn fetch_page(
        &self,
        _category: WallpaperCategory,
        _page: Option<u32>,
    ) -> Result<Vec<RawWallpaper>, ProviderError> {
        if self.manifest_url.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "manifest URL is empty".to_string(),
            ));
        }

        let request = self.client.get(&self.manifest_url);
        let entries: Vec<ManifestEntry> = fetch_json(PROVIDER_ID, request).await?;
        Ok(entries.into_iter().map(RawWallpaper::Cdn).collect())
    }
}
