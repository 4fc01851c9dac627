//! Shared HTTP plumbing for the hosted backends.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ProviderError;

/// Longest error body kept in an `ApiError` message.
const MAX_ERROR_MESSAGE: usize = 500;

/// Build a client with the per-call deadline applied.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to build HTTP client: {e}")))
}

/// Map a transport failure.
pub(crate) fn transport_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::HttpError(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Check the status and decode a successful JSON body.
///
/// 401/403 become `AuthError`, 429 becomes `RateLimited` (never retried
/// here), any other non-2xx becomes `ApiError` with the provider's message.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, ProviderError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ProviderError::AuthError);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ProviderError::RateLimited { retry_after });
    }

    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::ParseError(e.to_string()))
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().chars().take(MAX_ERROR_MESSAGE).collect(),
    }
}
