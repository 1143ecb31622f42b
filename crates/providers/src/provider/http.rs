//! Shared request/response plumbing for the provider clients.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::errors::ProviderError;

/// Per-call timeout enforced by every provider client.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_LOG_BODY_CHARS: usize = 512;

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("wallsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn body_preview(body: &str) -> String {
    let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        preview.push_str("...");
    }
    preview
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Send a request and decode a JSON body, mapping every failure to `ProviderError`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_transport(e, REQUEST_TIMEOUT))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after_secs(&response);
        debug!("{} rate limited, retry-after={:?}", provider, retry_after);
        return Err(ProviderError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_transport(e, REQUEST_TIMEOUT))?;

    if !status.is_success() {
        let preview = body_preview(&body);
        debug!("{} response error ({}): {}", provider, status, preview);
        return Err(ProviderError::api(
            status.as_u16(),
            if preview.is_empty() {
                format!("HTTP {}", status)
            } else {
                preview
            },
        ));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::decode(format!("{} JSON parse error: {}", provider, e)))
}
