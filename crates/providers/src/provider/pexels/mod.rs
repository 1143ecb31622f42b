//! Pexels provider.
//!
//! Curated feed for trending/featured, a portrait `wallpaper` search for new.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::models::{RawWallpaper, WallpaperCategory, WallpaperSource};
use crate::provider::http::{build_client, fetch_json};
use crate::provider::WallpaperProvider;

const PROVIDER_ID: &str = "PEXELS";
const BASE_URL: &str = "https://api.pexels.com";
const PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PexelsSrc {
    pub original: Option<String>,
    pub large2x: Option<String>,
    pub large: Option<String>,
    pub medium: Option<String>,
    pub small: Option<String>,
    pub portrait: Option<String>,
    pub landscape: Option<String>,
    pub tiny: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PexelsPhoto {
    pub id: u64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub url: Option<String>,
    pub photographer: Option<String>,
    pub photographer_url: Option<String>,
    pub avg_color: Option<String>,
    pub alt: Option<String>,
    #[serde(default)]
    pub src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

pub struct PexelsProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PexelsProvider {
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
impl WallpaperProvider for PexelsProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source(&self) -> WallpaperSource {
        WallpaperSource::Pexels
    }

    fn priority(&self) -> u8 {
        20
    }

    fn rate_limit_cooldown(&self) -> Duration {
        // 200 requests per hour.
        Duration::from_secs(60 * 60)
    }

    async fn fetch_page(
        &self,
        category: WallpaperCategory,
        page: Option<u32>,
    ) -> Result<Vec<RawWallpaper>, ProviderError> {
        let page = page.unwrap_or(1).max(1);
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("per_page", PER_PAGE.to_string()),
        ];

        let url = match category {
            WallpaperCategory::New => {
                query.push(("query", "wallpaper".to_string()));
                query.push(("orientation", "portrait".to_string()));
                format!("{}/v1/search", self.base_url)
            }
            WallpaperCategory::Trending | WallpaperCategory::Featured => {
                format!("{}/v1/curated", self.base_url)
            }
        };

        let request = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&query);

        let response: PexelsResponse = fetch_json(PROVIDER_ID, request).await?;
        Ok(response
            .photos
            .into_iter()
            .map(RawWallpaper::Pexels)
            .collect())
    }
}
