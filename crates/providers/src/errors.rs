//! Error types for wallpaper provider clients.

use std::time::Duration;
use thiserror::Error;

/// Retry policy class for provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Errors surfaced by a provider `fetch_page` call.
///
/// Every ordinary network or HTTP failure ends up here; provider clients never
/// panic on a bad response.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure (DNS, connection refused, TLS, reset).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the allotted time.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Non-2xx response from the provider API.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP 429 from the provider.
    #[error("Rate limited by provider{}", retry_after_suffix(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// The response body could not be deserialized.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Required configuration (API key, manifest URL) is missing or invalid.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

fn retry_after_suffix(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

impl ProviderError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Map a reqwest transport error, folding client timeouts into `Timeout`.
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err)
        }
    }


    /// Classify error for the scheduler's retry policy.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => RetryClass::ReauthRequired,
                408 | 409 | 423 | 425 | 429 => RetryClass::Retryable,
                500..=599 => RetryClass::Retryable,
                _ => RetryClass::Permanent,
            },
            Self::Http(_) | Self::Timeout(_) | Self::RateLimited { .. } => RetryClass::Retryable,
            Self::Decode(_) | Self::NotConfigured(_) => RetryClass::Permanent,
        }
    }
}
