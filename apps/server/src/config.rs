//! Daemon configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use wallsync_core::sync::{DEFAULT_PROVIDER_TIMEOUT, DEFAULT_SYNC_INTERVAL, MIN_SYNC_INTERVAL};
use wallsync_providers::ProvidersConfig;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8088";
const DEFAULT_RETENTION_DAYS: u64 = 30;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub listen_addr: SocketAddr,
    pub sync_interval: Duration,
    pub sync_on_start: bool,
    /// `None` disables retention.
    pub retention: Option<Duration>,
    pub provider_timeout: Duration,
    pub providers: ProvidersConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let listen_raw =
            read("WALLSYNC_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "WALLSYNC_LISTEN_ADDR",
                value: listen_raw.clone(),
                reason: e.to_string(),
            })?;

        let sync_interval = match read("WALLSYNC_SYNC_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_number("WALLSYNC_SYNC_INTERVAL_SECS", &raw)?),
            None => DEFAULT_SYNC_INTERVAL,
        }
        .max(MIN_SYNC_INTERVAL);

        let sync_on_start = match read("WALLSYNC_SYNC_ON_START") {
            Some(raw) => parse_flag("WALLSYNC_SYNC_ON_START", &raw)?,
            None => true,
        };

        let retention = match read("WALLSYNC_RETENTION_DAYS") {
            Some(raw) => retention_window(&raw)?,
            None => Some(Duration::from_secs(DEFAULT_RETENTION_DAYS * SECS_PER_DAY)),
        };

        let provider_timeout = match read("WALLSYNC_PROVIDER_TIMEOUT_SECS") {
            Some(raw) => match parse_number("WALLSYNC_PROVIDER_TIMEOUT_SECS", &raw)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        name: "WALLSYNC_PROVIDER_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be positive".to_string(),
                    })
                }
                secs => Duration::from_secs(secs),
            },
            None => DEFAULT_PROVIDER_TIMEOUT,
        };

        let providers = ProvidersConfig {
            unsplash_access_key: read("UNSPLASH_ACCESS_KEY"),
            pexels_api_key: read("PEXELS_API_KEY"),
            pixabay_api_key: read("PIXABAY_API_KEY"),
            wallhaven_api_key: read("WALLHAVEN_API_KEY"),
            manifest_url: read("WALLPAPER_MANIFEST_URL"),
            ..ProvidersConfig::default()
        };

        Ok(Config {
            data_dir: read("WALLSYNC_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            listen_addr,
            sync_interval,
            sync_on_start,
            retention,
            provider_timeout,
            providers,
        })
    }
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Zero days disables retention.
fn retention_window(raw: &str) -> Result<Option<Duration>, ConfigError> {
    let days = parse_number("WALLSYNC_RETENTION_DAYS", raw)?;
    if days == 0 {
        return Ok(None);
    }
    let secs = days
        .checked_mul(SECS_PER_DAY)
        .ok_or_else(|| ConfigError::Invalid {
            name: "WALLSYNC_RETENTION_DAYS",
            value: raw.to_string(),
            reason: "too large".to_string(),
        })?;
    Ok(Some(Duration::from_secs(secs)))
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
