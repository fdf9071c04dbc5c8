//! Instagram Graph API adapter: create a media container, then publish it

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use social_publish_domain::{
    ChannelType, PublishOutcome, PublishPayload, SocialProvider, SocialPublishError,
    formatting::PlatformRules,
};
use std::time::{Duration, Instant};

use super::{PlatformCredentials, http_client, not_ready, read_body, rejected, transport_error};

const PLATFORM: &str = "Instagram";

#[derive(Debug, Clone)]
pub struct InstagramConfig {
    pub base_url: String,
    pub credentials: PlatformCredentials,
    pub timeout: Duration,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com/v19.0".to_string(),
            credentials: PlatformCredentials::missing(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct InstagramProvider {
    client: Client,
    config: InstagramConfig,
    rules: PlatformRules,
}

/// Result of one Graph API step
enum Step {
    Created(String, Value),
    Rejected(PublishOutcome),
}

impl InstagramProvider {
    pub fn new(config: InstagramConfig) -> Self {
        Self {
            client: http_client(config.timeout),
            config,
            rules: PlatformRules::for_channel(ChannelType::Instagram),
        }
    }

    async fn post_step(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        token: &SecretString,
    ) -> Result<Step, SocialPublishError> {
        let url = format!("{}/me/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("access_token", token.expose_secret()));

        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(PLATFORM, e.without_url()))?;

        let status = response.status();
        let body = read_body(response).await?;
        if !status.is_success() {
            tracing::warn!(endpoint = endpoint, status = status.as_u16(), "Instagram rejected request");
            return Ok(Step::Rejected(rejected(PLATFORM, status, body)));
        }

        let id = body.get("id").and_then(Value::as_str).map(String::from);
        match id {
            Some(id) => Ok(Step::Created(id, body)),
            None => Ok(Step::Rejected(
                PublishOutcome::failed(format!("Instagram {} response missing id", endpoint))
                    .with_raw_response(body),
            )),
        }
    }
}

#[async_trait]
impl SocialProvider for InstagramProvider {
    fn is_configured(&self) -> bool {
        self.config.credentials.has_client()
    }

    fn is_ready_to_publish(&self) -> bool {
        self.config.credentials.access_token().is_some()
    }

    async fn publish(&self, payload: &PublishPayload) -> Result<PublishOutcome, SocialPublishError> {
        tracing::info!(
            publication_id = %payload.publication_id,
            content_length = payload.content_length(),
            has_media = payload.media_url.is_some(),
            "Publishing to Instagram"
        );

        let Some(image_url) = payload.media_url.as_deref() else {
            return Ok(PublishOutcome::failed(
                "Instagram requires an image or video URL",
            ));
        };

        let Some(token) = self.config.credentials.access_token() else {
            tracing::warn!(publication_id = %payload.publication_id, "Instagram access token missing");
            return Ok(not_ready(PLATFORM, "missing access token"));
        };

        let caption = self
            .rules
            .caption(&payload.content.body, &payload.content.hashtags);
        let started = Instant::now();

        let (container_id, container) = match self
            .post_step("media", &[("image_url", image_url), ("caption", caption.as_str())], &token)
            .await
        {
            Ok(Step::Created(id, body)) => (id, body),
            Ok(Step::Rejected(outcome)) => return Ok(outcome),
            Err(e) => {
                tracing::error!(publication_id = %payload.publication_id, error = %e, "Instagram container request failed");
                return Err(e);
            }
        };

        tracing::debug!(
            publication_id = %payload.publication_id,
            container_id = %container_id,
            "Created Instagram media container"
        );

        let outcome = match self
            .post_step("media_publish", &[("creation_id", container_id.as_str())], &token)
            .await
        {
            Ok(Step::Created(media_id, published)) => {
                let url = format!("https://www.instagram.com/p/{}/", media_id);
                PublishOutcome::published(media_id, Some(url)).with_raw_response(json!({
                    "container": container,
                    "publish": published,
                }))
            }
            Ok(Step::Rejected(outcome)) => outcome,
            Err(e) => {
                tracing::error!(publication_id = %payload.publication_id, error = %e, "Instagram publish request failed");
                return Err(e);
            }
        };

        tracing::info!(
            publication_id = %payload.publication_id,
            success = outcome.success,
            external_id = ?outcome.external_post_id,
            duration_ms = started.elapsed().as_millis() as u64,
            "Instagram publish finished"
        );

        Ok(outcome)
    }
}
