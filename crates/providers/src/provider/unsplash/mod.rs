//! Unsplash provider.
//!
//! Uses the public Unsplash API (`/photos` and the `wallpapers` topic feed).
//! Requires an access key, sent as `Authorization: Client-ID <key>`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::models::{RawWallpaper, WallpaperCategory, WallpaperSource};
use crate::provider::http::{build_client, fetch_json};
use crate::provider::WallpaperProvider;

const PROVIDER_ID: &str = "UNSPLASH";
const BASE_URL: &str = "https://api.unsplash.com";
const WALLPAPER_TOPIC: &str = "wallpapers";
const PER_PAGE: u32 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsplashUrls {
    pub raw: Option<String>,
    pub full: Option<String>,
    pub regular: Option<String>,
    pub small: Option<String>,
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsplashLinks {
    pub html: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsplashUser {
    pub name: Option<String>,
    #[serde(default)]
    pub links: UnsplashLinks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsplashTag {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnsplashPhoto {
    pub id: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub alt_description: Option<String>,
    pub likes: Option<i64>,
    pub created_at: Option<String>,
    #[serde(default)]
    pub urls: UnsplashUrls,
    #[serde(default)]
    pub links: UnsplashLinks,
    pub user: Option<UnsplashUser>,
    pub tags: Option<Vec<UnsplashTag>>,
}

pub struct UnsplashProvider {
    client: Client,
    access_key: String,
    base_url: String,
}

impl UnsplashProvider {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self::with_base_url(access_key, BASE_URL)
    }

    pub fn with_base_url(access_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            access_key: access_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, category: WallpaperCategory) -> (String, Option<&'static str>) {
        match category {
            WallpaperCategory::New => (format!("{}/photos", self.base_url), Some("latest")),
            WallpaperCategory::Trending => (format!("{}/photos", self.base_url), Some("popular")),
            WallpaperCategory::Featured => (
                format!("{}/topics/{}/photos", self.base_url, WALLPAPER_TOPIC),
                None,
            ),
        }
    }
}

#[async_trait]
impl WallpaperProvider for UnsplashProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn source(&self) -> WallpaperSource {
        WallpaperSource::Unsplash
    }

    fn priority(&self) -> u8 {
        10
    }

    fn rate_limit_cooldown(&self) -> Duration {
        // Demo-tier quota is 50 requests per hour.
        Duration::from_secs(60 * 60)
    }

    async fn fetch_page(
        &self,
        category: WallpaperCategory,
        page: Option<u32>,
    ) -> Result<Vec<RawWallpaper>, ProviderError> {
        let (url, order_by) = self.endpoint(category);
        let page = page.unwrap_or(1).max(1);

        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("per_page", PER_PAGE.to_string()),
            ("orientation", "portrait".to_string()),
        ];
        if let Some(order_by) = order_by {
            query.push(("order_by", order_by.to_string()));
        }

        let request = self
            .client
            .get(&url)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .query(&query);

        let photos: Vec<UnsplashPhoto> = fetch_json(PROVIDER_ID, request).await?;
        Ok(photos.into_iter().map(RawWallpaper::Unsplash).collect())
    }
}
