//! Pixabay provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::models::{RawWallpaper, WallpaperCategory, WallpaperSource};
use crate::provider::http::{build_client, fetch_json};
use crate::provider::WallpaperProvider;

const PROVIDER_ID: &str = "PIXABAY";
const BASE_URL: &str = "https://pixabay.com";
const PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct PixabayHit {
    pub id: u64,
    #[serde(rename = "pageURL")]
    pub page_url: Option<String>,
    /// Comma-separated.
    pub tags: Option<String>,
    #[serde(rename = "previewURL")]
    pub preview_url: Option<String>,
    #[serde(rename = "webformatURL")]
    pub webformat_url: Option<String>,
    #[serde(rename = "largeImageURL")]
    pub large_image_url: Option<String>,
    #[serde(rename = "imageWidth")]
    pub image_width: Option<i64>,
    #[serde(rename = "imageHeight")]
    pub image_height: Option<i64>,
    pub likes: Option<i64>,
    pub user: Option<String>,
    pub user_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PixabayResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

pub struct PixabayProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PixabayProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl WallpaperProvider for PixabayProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source(&self) -> WallpaperSource {
        WallpaperSource::Pixabay
    }

    fn priority(&self) -> u8 {
        40
    }

    fn rate_limit_cooldown(&self) -> Duration {
        // 100 requests per 60 seconds.
        Duration::from_secs(60)
    }

    async fn fetch_page(
        &self,
        category: WallpaperCategory,
        page: Option<u32>,
    ) -> Result<Vec<RawWallpaper>, ProviderError> {
        let page = page.unwrap_or(1).max(1);
        let order = match category {
            WallpaperCategory::New => "latest",
            WallpaperCategory::Trending | WallpaperCategory::Featured => "popular",
        };

        let mut query: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("image_type", "photo".to_string()),
            ("safesearch", "true".to_string()),
            ("orientation", "vertical".to_string()),
            ("order", order.to_string()),
            ("page", page.to_string()),
            ("per_page", PER_PAGE.to_string()),
        ];
        if category == WallpaperCategory::Featured {
            query.push(("editors_choice", "true".to_string()));
        }

        let request = self
            .client
            .get(format!("{}/api/", self.base_url))
            .query(&query);

        let response: PixabayResponse = fetch_json(PROVIDER_ID, request).await?;
        Ok(response.hits.into_iter().map(RawWallpaper::Pixabay).collect())
    }
}
