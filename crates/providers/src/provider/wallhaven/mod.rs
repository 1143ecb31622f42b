//! Wallhaven provider.
//!
//! Works without a key (SFW content only); an optional key raises the quota.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::models::{RawWallpaper, WallpaperCategory, WallpaperSource};
use crate::provider::http::{build_client, fetch_json};
use crate::provider::WallpaperProvider;

const PROVIDER_ID: &str = "WALLHAVEN";
const BASE_URL: &str = "https://wallhaven.cc";
/// General category only, SFW purity only.
const CATEGORIES: &str = "100";
const PURITY: &str = "100";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WallhavenThumbs {
    pub large: Option<String>,
    pub original: Option<String>,
    pub small: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WallhavenTag {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WallhavenWallpaper {
    pub id: String,
    pub url: Option<String>,
    pub dimension_x: Option<i64>,
    pub dimension_y: Option<i64>,
    pub favorites: Option<i64>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub thumbs: WallhavenThumbs,
    pub tags: Option<Vec<WallhavenTag>>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WallhavenResponse {
    #[serde(default)]
    data: Vec<WallhavenWallpaper>,
}

pub struct WallhavenProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl WallhavenProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn sorting(category: WallpaperCategory) -> &'static str {
        match category {
            WallpaperCategory::New => "date_added",
            WallpaperCategory::Trending => "hot",
            WallpaperCategory::Featured => "toplist",
        }
    }
}

#[async_trait]
impl WallpaperProvider for WallhavenProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source(&self) -> WallpaperSource {
        WallpaperSource::Wallhaven
    }

    fn priority(&self) -> u8 {
        30
    }

    fn rate_limit_cooldown(&self) -> Duration {
        // 45 calls per minute.
        Duration::from_secs(60)
    }

    async fn fetch_page(
        &self,
        category: WallpaperCategory,
        page: Option<u32>,
    ) -> Result<Vec<RawWallpaper>, ProviderError> {
        let page = page.unwrap_or(1).max(1);
        let mut query: Vec<(&str, String)> = vec![
            ("sorting", Self::sorting(category).to_string()),
            ("categories", CATEGORIES.to_string()),
            ("purity", PURITY.to_string()),
            ("ratios", "portrait".to_string()),
            ("page", page.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        let request = self
            .client
            .get(format!("{}/api/v1/search", self.base_url))
            .query(&query);

        let response: WallhavenResponse = fetch_json(PROVIDER_ID, request).await?;
        Ok(response
            .data
            .into_iter()
            .map(RawWallpaper::Wallhaven)
            .collect())
    }
}
