//! Shared HTTP response helpers for the registry client.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, 404 as an absent result, non-success → [`RegistryError::Api`]) so
//! the endpoint methods stay focused on request construction and response
//! mapping.

use reqwest::StatusCode;

use crate::error::RegistryError;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`RegistryError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`RegistryError::Api`] with status code and
///   response body.
pub async fn check_response(
    resp: reqwest::Response,
) -> Result<reqwest::Response, RegistryError> {
    if resp.status() == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = parse_retry_after(&resp);
        return Err(RegistryError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(RegistryError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Like [`check_response`], but a 404 means "no such gem or version" and
/// yields `None` instead of an error.
pub async fn check_optional(
    resp: reqwest::Response,
) -> Result<Option<reqwest::Response>, RegistryError> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    check_response(resp).await.map(Some)
}

/// Parse the `Retry-After` header as seconds, falling back to 60 s.
fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}
