//! Twitter v1.1 platform implementation
//!
//! - [`TwitterStreamClient`]: `POST statuses/filter.json`, a long-lived
//!   chunked response carrying one JSON message per line
//! - [`TwitterRestClient`]: `POST statuses/retweet/:id.json`
//!
//! Both sign every request with OAuth 1.0a user credentials (see [`oauth`]).

use serde::Deserialize;

use crate::error::PlatformError;

pub mod oauth;
pub mod rest;
pub mod stream;

pub use rest::TwitterRestClient;
pub use stream::TwitterStreamClient;

pub(crate) const USER_AGENT: &str = concat!("reshare-bot/", env!("CARGO_PKG_VERSION"));

/// Error code returned when the account already retweeted the status
const ALREADY_RETWEETED: u32 = 327;

#[derive(Debug, Deserialize)]
struct ApiErrors {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

/// Map a non-success HTTP response to a `PlatformError`
///
/// The API reports failures as `{"errors": [{"code": .., "message": ..}]}`.
/// The error code wins over the status when it identifies an already
/// re-shared post, which the API reports as 403.
pub(crate) fn classify_failure(status: u16, body: &str, context: &str) -> PlatformError {
    let errors = serde_json::from_str::<ApiErrors>(body)
        .map(|e| e.errors)
        .unwrap_or_default();

    if let Some(entry) = errors.iter().find(|e| e.code == ALREADY_RETWEETED) {
        return PlatformError::AlreadyReshared(entry.message.clone());
    }

    let detail = match errors.first() {
        Some(entry) => format!("{} (code {})", entry.message, entry.code),
        None if body.trim().is_empty() => "no response body".to_string(),
        None => body.trim().chars().take(200).collect(),
    };

    match status {
        401 | 403 => PlatformError::Authentication(format!(
            "Twitter rejected credentials during {} (HTTP {}): {}",
            context, status, detail
        )),
        420 | 429 => PlatformError::RateLimit(format!(
            "Twitter rate limit hit during {} (HTTP {}): {}",
            context, status, detail
        )),
        _ => PlatformError::Api(format!(
            "Twitter {} failed (HTTP {}): {}",
            context, status, detail
        )),
    }
}

pub(crate) async fn map_http_error(response: reqwest::Response, context: &str) -> PlatformError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    classify_failure(status, &body, context)
}

pub(crate) fn map_transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    PlatformError::Network(format!("Twitter {} request failed: {}", context, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_retweeted_detected_from_code() {
        let body = r#"{"errors":[{"code":327,"message":"You have already retweeted this Tweet."}]}"#;
        match classify_failure(403, body, "retweet") {
            PlatformError::AlreadyReshared(msg) => {
                assert_eq!(msg, "You have already retweeted this Tweet.")
            }
            other => panic!("Expected AlreadyReshared, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_statuses() {
        let body = r#"{"errors":[{"code":32,"message":"Could not authenticate you."}]}"#;
        let err = classify_failure(401, body, "subscribe");
        assert!(matches!(err, PlatformError::Authentication(_)));
        assert!(err.to_string().contains("Could not authenticate you. (code 32)"));
    }

    #[test]
    fn test_rate_limit_statuses() {
        assert!(matches!(
            classify_failure(420, "", "subscribe"),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            classify_failure(429, "", "retweet"),
            PlatformError::RateLimit(_)
        ));
    }

    #[test]
    fn test_other_status_keeps_plain_body() {
        let err = classify_failure(503, "Service Unavailable", "subscribe");
        assert!(matches!(err, PlatformError::Api(_)));
        assert!(err.to_string().contains("HTTP 503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }
}
