//! Social platform adapters

mod credentials;
mod instagram;
mod linkedin;
mod tiktok;

pub use credentials::{CredentialSource, PlatformCredentials};
pub use instagram::{InstagramConfig, InstagramProvider};
pub use linkedin::{LinkedInConfig, LinkedInProvider};
pub use tiktok::{TikTokConfig, TikTokProvider};

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use social_publish_domain::{PublishOutcome, SocialPublishError};
use std::time::Duration;

pub(crate) fn http_client(timeout: Duration) -> Client {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            // Requests still set their own timeout
            tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
            Client::new()
        }
    }
}

/// Read a response body as JSON, keeping non-JSON bodies as a string
pub(crate) async fn read_body(response: Response) -> Result<Value, SocialPublishError> {
    let body = response
        .text()
        .await
        .map_err(|e| SocialPublishError::Network(e.to_string()))?;

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

/// Negative outcome for a non-2xx platform response
pub(crate) fn rejected(platform: &str, status: StatusCode, body: Value) -> PublishOutcome {
    let detail = ["/error/message", "/message", "/error_description"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .map(|message| format!(": {}", message))
        .unwrap_or_default();

    PublishOutcome::failed(format!(
        "{} API returned HTTP {}{}",
        platform,
        status.as_u16(),
        detail
    ))
    .with_raw_response(body)
}

pub(crate) fn not_ready(platform: &str, reason: &str) -> PublishOutcome {
    PublishOutcome::failed(format!("{} is not configured: {}", platform, reason))
}

pub(crate) fn transport_error(platform: &str, error: reqwest::Error) -> SocialPublishError {
    SocialPublishError::Network(format!("{} request failed: {}", platform, error))
}
