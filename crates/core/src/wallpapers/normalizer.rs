//! Raw provider record -> `CanonicalWallpaper`.
//!
//! Normalization never fails: missing fields default, bad numbers clamp to
//! zero and unparseable dates become `None`.

use chrono::{DateTime, NaiveDateTime, Utc};
use wallsync_providers::provider::cdn_manifest::ManifestEntry;
use wallsync_providers::provider::pexels::PexelsPhoto;
use wallsync_providers::provider::pixabay::PixabayHit;
use wallsync_providers::provider::unsplash::UnsplashPhoto;
use wallsync_providers::provider::wallhaven::WallhavenWallpaper;
use wallsync_providers::{RawWallpaper, WallpaperCategory, WallpaperSource};

use super::wallpaper_model::CanonicalWallpaper;

const PROVIDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses an ISO-8601/RFC 3339 timestamp, then `yyyy-MM-dd HH:mm:ss` as UTC.
pub fn parse_provider_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, PROVIDER_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Normalize one raw record. `category` and `synced_at` come from the pass.
pub fn normalize(
    raw: RawWallpaper,
    category: WallpaperCategory,
    synced_at: DateTime<Utc>,
) -> CanonicalWallpaper {
    let fields = match raw {
        RawWallpaper::Unsplash(photo) => from_unsplash(photo),
        RawWallpaper::Pexels(photo) => from_pexels(photo),
        RawWallpaper::Wallhaven(wallpaper) => from_wallhaven(wallpaper),
        RawWallpaper::Pixabay(hit) => from_pixabay(hit),
        RawWallpaper::Cdn(entry) => from_manifest(entry),
    };

    CanonicalWallpaper {
        id: CanonicalWallpaper::canonical_id(fields.source, &fields.source_local_id),
        source_local_id: fields.source_local_id,
        source: fields.source,
        thumbnail_url: fields.thumbnail_url,
        preview_url: fields.preview_url,
        full_url: fields.full_url,
        original_url: fields.original_url,
        width: dimension(fields.width),
        height: dimension(fields.height),
        category,
        photographer_name: fields.photographer_name,
        photographer_url: fields.photographer_url,
        source_url: fields.source_url,
        description: fields.description,
        tags: fields.tags,
        likes: fields.likes.unwrap_or(0).max(0),
        dominant_color: fields.dominant_color,
        is_premium: fields.is_premium,
        created_at: fields.created_at,
        synced_at,
        viewed: false,
        is_cached: false,
        local_cache_path: None,
    }
}

struct NormalizedFields {
    source: WallpaperSource,
    source_local_id: String,
    thumbnail_url: String,
    preview_url: String,
    full_url: String,
    original_url: String,
    width: Option<i64>,
    height: Option<i64>,
    photographer_name: String,
    photographer_url: Option<String>,
    source_url: String,
    description: String,
    tags: Vec<String>,
    likes: Option<i64>,
    dominant_color: Option<String>,
    is_premium: bool,
    created_at: Option<DateTime<Utc>>,
}

/// First non-blank candidate, else the first non-blank URL of the record.
fn pick_url(chain: &[Option<&str>], any: &[Option<&str>]) -> String {
    chain
        .iter()
        .chain(any.iter())
        .filter_map(|candidate| *candidate)
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn text(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn color(value: Option<&str>) -> Option<String> {
    optional_text(value).map(|c| c.to_ascii_lowercase())
}

fn dimension(value: Option<i64>) -> i32 {
    value.unwrap_or(0).clamp(0, i64::from(i32::MAX)) as i32
}

fn clean_tags<'a>(tags: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    tags.filter_map(optional_text).collect()
}

fn from_unsplash(photo: UnsplashPhoto) -> NormalizedFields {
    let urls = &photo.urls;
    let (raw, full, regular, small, thumb) = (
        urls.raw.as_deref(),
        urls.full.as_deref(),
        urls.regular.as_deref(),
        urls.small.as_deref(),
        urls.thumb.as_deref(),
    );
    let any = [full, regular, raw, small, thumb];
    let user = photo.user.as_ref();

    NormalizedFields {
        source: WallpaperSource::Unsplash,
        source_local_id: photo.id.trim().to_string(),
        thumbnail_url: pick_url(&[small, thumb, regular], &any),
        preview_url: pick_url(&[regular, small, full], &any),
        full_url: pick_url(&[full, regular, raw], &any),
        original_url: pick_url(&[raw, full], &any),
        width: photo.width,
        height: photo.height,
        photographer_name: text(user.and_then(|u| u.name.as_deref())),
        photographer_url: optional_text(user.and_then(|u| u.links.html.as_deref())),
        source_url: text(photo.links.html.as_deref()),
        description: text(
            photo
                .description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .or(photo.alt_description.as_deref()),
        ),
        tags: photo
            .tags
            .as_deref()
            .map(|tags| clean_tags(tags.iter().map(|t| t.title.as_deref())))
            .unwrap_or_default(),
        likes: photo.likes,
        dominant_color: color(photo.color.as_deref()),
        is_premium: false,
        created_at: photo
            .created_at
            .as_deref()
            .and_then(parse_provider_timestamp),
    }
}

fn from_pexels(photo: PexelsPhoto) -> NormalizedFields {
    let src = &photo.src;
    let (original, large2x, large, medium, small) = (
        src.original.as_deref(),
        src.large2x.as_deref(),
        src.large.as_deref(),
        src.medium.as_deref(),
        src.small.as_deref(),
    );
    let any = [
        large2x,
        large,
        original,
        medium,
        small,
        src.portrait.as_deref(),
        src.landscape.as_deref(),
        src.tiny.as_deref(),
    ];

    NormalizedFields {
        source: WallpaperSource::Pexels,
        source_local_id: photo.id.to_string(),
        thumbnail_url: pick_url(&[medium, small, large], &any),
        preview_url: pick_url(&[large, large2x, medium], &any),
        full_url: pick_url(&[large2x, large, original], &any),
        original_url: pick_url(&[original, large2x], &any),
        width: photo.width,
        height: photo.height,
        photographer_name: text(photo.photographer.as_deref()),
        photographer_url: optional_text(photo.photographer_url.as_deref()),
        source_url: text(photo.url.as_deref()),
        description: text(photo.alt.as_deref()),
        tags: Vec::new(),
        likes: None,
        dominant_color: color(photo.avg_color.as_deref()),
        is_premium: false,
        created_at: None,
    }
}

fn from_wallhaven(wallpaper: WallhavenWallpaper) -> NormalizedFields {
    let thumbs = &wallpaper.thumbs;
    let (small, large, thumb_original, path) = (
        thumbs.small.as_deref(),
        thumbs.large.as_deref(),
        thumbs.original.as_deref(),
        wallpaper.path.as_deref(),
    );
    let any = [path, thumb_original, large, small];

    NormalizedFields {
        source: WallpaperSource::Wallhaven,
        source_local_id: wallpaper.id.trim().to_string(),
        thumbnail_url: pick_url(&[small, large], &any),
        preview_url: pick_url(&[large, thumb_original], &any),
        full_url: pick_url(&[path], &any),
        original_url: pick_url(&[path], &any),
        width: wallpaper.dimension_x,
        height: wallpaper.dimension_y,
        photographer_name: String::new(),
        photographer_url: None,
        source_url: text(wallpaper.url.as_deref()),
        description: String::new(),
        tags: wallpaper
            .tags
            .as_deref()
            .map(|tags| clean_tags(tags.iter().map(|t| t.name.as_deref())))
            .unwrap_or_default(),
        likes: wallpaper.favorites,
        dominant_color: color(wallpaper.colors.first().map(String::as_str)),
        is_premium: false,
        created_at: wallpaper
            .created_at
            .as_deref()
            .and_then(parse_provider_timestamp),
    }
}

fn from_pixabay(hit: PixabayHit) -> NormalizedFields {
    let (preview, webformat, large) = (
        hit.preview_url.as_deref(),
        hit.webformat_url.as_deref(),
        hit.large_image_url.as_deref(),
    );
    let any = [large, webformat, preview];
    let photographer_url = match (optional_text(hit.user.as_deref()), hit.user_id) {
        (Some(user), Some(user_id)) => {
            Some(format!("https://pixabay.com/users/{}-{}/", user, user_id))
        }
        _ => None,
    };

    NormalizedFields {
        source: WallpaperSource::Pixabay,
        source_local_id: hit.id.to_string(),
        thumbnail_url: pick_url(&[preview, webformat], &any),
        preview_url: pick_url(&[webformat, large], &any),
        full_url: pick_url(&[large, webformat], &any),
        original_url: pick_url(&[large], &any),
        width: hit.image_width,
        height: hit.image_height,
        photographer_name: text(hit.user.as_deref()),
        photographer_url,
        source_url: text(hit.page_url.as_deref()),
        description: String::new(),
        tags: hit
            .tags
            .as_deref()
            .map(|tags| clean_tags(tags.split(',').map(Some)))
            .unwrap_or_default(),
        likes: hit.likes,
        dominant_color: None,
        is_premium: false,
        created_at: None,
    }
}

fn from_manifest(entry: ManifestEntry) -> NormalizedFields {
    let (image, thumb) = (entry.image.as_deref(), entry.thumb.as_deref());
    let any = [image, thumb];

    NormalizedFields {
        source: WallpaperSource::Cdn,
        source_local_id: entry.id.trim().to_string(),
        thumbnail_url: pick_url(&[thumb, image], &any),
        preview_url: pick_url(&[thumb, image], &any),
        full_url: pick_url(&[image], &any),
        original_url: pick_url(&[image], &any),
        width: None,
        height: None,
        photographer_name: String::new(),
        photographer_url: None,
        source_url: String::new(),
        description: String::new(),
        tags: clean_tags(std::iter::once(entry.category.as_deref())),
        likes: None,
        dominant_color: None,
        is_premium: entry.is_pro,
        created_at: None,
    }
}
