//! TikTok Content Posting API adapter (direct post from a pulled video URL)

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use social_publish_domain::{
    ChannelType, PublishOutcome, PublishPayload, SocialProvider, SocialPublishError,
    formatting::PlatformRules, formatting::truncate_with_ellipsis,
};
use std::time::{Duration, Instant};

use super::{PlatformCredentials, http_client, not_ready, read_body, rejected, transport_error};

const PLATFORM: &str = "TikTok";
const MAX_TITLE_CHARS: usize = 150;

#[derive(Debug, Clone)]
pub struct TikTokConfig {
    pub base_url: String,
    pub credentials: PlatformCredentials,
    pub privacy_level: String,
    pub disable_comment: bool,
    pub disable_duet: bool,
    pub disable_stitch: bool,
    pub timeout: Duration,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.tiktokapis.com/v2".to_string(),
            credentials: PlatformCredentials::missing(),
            privacy_level: "PUBLIC_TO_EVERYONE".to_string(),
            disable_comment: false,
            disable_duet: false,
            disable_stitch: false,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct TikTokProvider {
    client: Client,
    config: TikTokConfig,
    rules: PlatformRules,
}

impl TikTokProvider {
    pub fn new(config: TikTokConfig) -> Self {
        Self {
            client: http_client(config.timeout),
            config,
            rules: PlatformRules::for_channel(ChannelType::Tiktok),
        }
    }

    fn status_url(&self, publish_id: &str) -> String {
        format!(
            "{}/post/publish/status/fetch/?publish_id={}",
            self.config.base_url.trim_end_matches('/'),
            publish_id
        )
    }
}

#[derive(Serialize)]
struct InitRequest {
    post_info: PostInfo,
    source_info: SourceInfo,
}

#[derive(Serialize)]
struct PostInfo {
    title: String,
    description: String,
    privacy_level: String,
    disable_comment: bool,
    disable_duet: bool,
    disable_stitch: bool,
}

#[derive(Serialize)]
struct SourceInfo {
    source: &'static str,
    video_url: String,
}

#[async_trait]
impl SocialProvider for TikTokProvider {
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
            "Publishing to TikTok"
        );

        let Some(video_url) = payload.media_url.clone() else {
            return Ok(PublishOutcome::failed("TikTok requires a video URL"));
        };

        let Some(token) = self.config.credentials.access_token() else {
            tracing::warn!(publication_id = %payload.publication_id, "TikTok access token missing");
            return Ok(not_ready(PLATFORM, "missing access token"));
        };

        let request = InitRequest {
            post_info: PostInfo {
                title: self
                    .rules
                    .caption(&payload.content.body, &payload.content.hashtags),
                description: truncate_with_ellipsis(payload.content.title.trim(), MAX_TITLE_CHARS),
                privacy_level: self.config.privacy_level.clone(),
                disable_comment: self.config.disable_comment,
                disable_duet: self.config.disable_duet,
                disable_stitch: self.config.disable_stitch,
            },
            source_info: SourceInfo {
                source: "PULL_FROM_URL",
                video_url,
            },
        };

        let url = format!(
            "{}/post/publish/video/init/",
            self.config.base_url.trim_end_matches('/')
        );
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .header("Authorization", format!("Bearer {}", token.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(publication_id = %payload.publication_id, error = %e, "TikTok request failed");
                transport_error(PLATFORM, e)
            })?;

        let status = response.status();
        let body = read_body(response).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            tracing::warn!(
                publication_id = %payload.publication_id,
                status = status.as_u16(),
                duration_ms = duration_ms,
                "TikTok rejected the post"
            );
            return Ok(rejected(PLATFORM, status, body));
        }

        let error_code = body
            .pointer("/error/code")
            .and_then(Value::as_str)
            .unwrap_or("ok");
        let publish_id = body
            .pointer("/data/publish_id")
            .and_then(Value::as_str)
            .map(String::from);

        let outcome = match publish_id {
            Some(id) if error_code == "ok" => {
                let status_url = self.status_url(&id);
                PublishOutcome::published(id, Some(status_url)).with_raw_response(body)
            }
            _ => {
                let message = body
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or("response missing publish_id");
                PublishOutcome::failed(format!("TikTok publish failed: {}", message))
                    .with_raw_response(body)
            }
        };

        tracing::info!(
            publication_id = %payload.publication_id,
            success = outcome.success,
            external_id = ?outcome.external_post_id,
            duration_ms = duration_ms,
            "TikTok publish finished"
        );

        Ok(outcome)
    }
}
