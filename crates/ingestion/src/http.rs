//! Shared HTTP response handling for the provider clients.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{IngestionError, Result};

/// Longest response body excerpt carried into an error.
const BODY_EXCERPT: usize = 200;

/// Pass successful responses through; classify the rest.
///
/// 5xx, 408 and 429 are transient, 401/403 mean the credentials are wrong,
/// anything else is a response we cannot use.
pub(crate) async fn check_status(response: Response, scope: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(BODY_EXCERPT).collect();

    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Err(IngestionError::transient(
            scope,
            format!("HTTP {}: {}", status, excerpt),
        ))
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(IngestionError::Configuration(format!(
            "{} rejected the credentials (HTTP {})",
            scope, status
        )))
    } else {
        Err(IngestionError::DataValidation(format!(
            "{}: HTTP {}: {}",
            scope, status, excerpt
        )))
    }
}

/// Check the status, then parse the body as JSON.
///
/// A successful response whose body does not parse is unusable, not
/// transient: it fails with `DataValidation` and is never retried.
pub(crate) async fn json_body<T: DeserializeOwned>(response: Response, scope: &str) -> Result<T> {
    let body = check_status(response, scope).await?.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| {
        let excerpt: String = String::from_utf8_lossy(&body)
            .chars()
            .take(BODY_EXCERPT)
            .collect();
        IngestionError::DataValidation(format!(
            "{}: malformed response ({}): {}",
            scope, e, excerpt
        ))
    })
}

/// Base URL without a trailing slash.
pub(crate) fn base_url(url: &str) -> &str {
    url.trim_end_matches('/')
}
