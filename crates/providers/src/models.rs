//! Source tags, query categories and raw provider records.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::provider::cdn_manifest::ManifestEntry;
use crate::provider::pexels::PexelsPhoto;
use crate::provider::pixabay::PixabayHit;
use crate::provider::unsplash::UnsplashPhoto;
use crate::provider::wallhaven::WallhavenWallpaper;

/// External source a wallpaper was pulled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallpaperSource {
    Unsplash,
    Pexels,
    Wallhaven,
    Pixabay,
    Cdn,
}

impl WallpaperSource {
    pub const ALL: [WallpaperSource; 5] = [
        WallpaperSource::Unsplash,
        WallpaperSource::Pexels,
        WallpaperSource::Wallhaven,
        WallpaperSource::Pixabay,
        WallpaperSource::Cdn,
    ];

    /// Lowercase tag used in canonical ids and persisted columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            WallpaperSource::Unsplash => "unsplash",
            WallpaperSource::Pexels => "pexels",
            WallpaperSource::Wallhaven => "wallhaven",
            WallpaperSource::Pixabay => "pixabay",
            WallpaperSource::Cdn => "cdn",
        }
    }
}

impl fmt::Display for WallpaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WallpaperSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        WallpaperSource::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("Unknown wallpaper source '{}'", value))
    }
}

/// Coarse grouping assigned by the sync engine per provider query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallpaperCategory {
    New,
    Trending,
    Featured,
}

impl WallpaperCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WallpaperCategory::New => "new",
            WallpaperCategory::Trending => "trending",
            WallpaperCategory::Featured => "featured",
        }
    }
}

impl fmt::Display for WallpaperCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WallpaperCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(WallpaperCategory::New),
            "trending" => Ok(WallpaperCategory::Trending),
            "featured" => Ok(WallpaperCategory::Featured),
            other => Err(format!("Unknown wallpaper category '{}'", other)),
        }
    }
}

/// One record as returned by a provider, before normalization.
#[derive(Debug, Clone)]
pub enum RawWallpaper {
    Unsplash(UnsplashPhoto),
    Pexels(PexelsPhoto),
    Wallhaven(WallhavenWallpaper),
    Pixabay(PixabayHit),
    Cdn(ManifestEntry),
}

impl RawWallpaper {
    pub fn source(&self) -> WallpaperSource {
        match self {
            RawWallpaper::Unsplash(_) => WallpaperSource::Unsplash,
            RawWallpaper::Pexels(_) => WallpaperSource::Pexels,
            RawWallpaper::Wallhaven(_) => WallpaperSource::Wallhaven,
            RawWallpaper::Pixabay(_) => WallpaperSource::Pixabay,
            RawWallpaper::Cdn(_) => WallpaperSource::Cdn,
        }
    }

    /// The provider's own identifier, rendered as a string.
    pub fn source_local_id(&self) -> String {
        match self {
            RawWallpaper::Unsplash(photo) => photo.id.clone(),
            RawWallpaper::Pexels(photo) => photo.id.to_string(),
            RawWallpaper::Wallhaven(wallpaper) => wallpaper.id.clone(),
            RawWallpaper::Pixabay(hit) => hit.id.to_string(),
            RawWallpaper::Cdn(entry) => entry.id.clone(),
        }
    }
}

/// Accepts `"abc"` or `123` and yields a string id.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(value) => Ok(value),
        StringOrNumber::Int(value) => Ok(value.to_string()),
        StringOrNumber::Float(value) => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tags_round_trip_through_from_str() {
        for source in WallpaperSource::ALL {
            assert_eq!(source.as_str().parse::<WallpaperSource>(), Ok(source));
        }
        assert!("flickr".parse::<WallpaperSource>().is_err());
    }

    #[test]
    fn source_serialization_matches_persisted_tags() {
        let json = serde_json::to_string(&WallpaperSource::Wallhaven).unwrap();
        assert_eq!(json, "\"wallhaven\"");
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(
            " Trending ".parse::<WallpaperCategory>(),
            Ok(WallpaperCategory::Trending)
        );
        assert!("weekly".parse::<WallpaperCategory>().is_err());
    }
}
