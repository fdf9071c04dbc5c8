//! LinkedIn UGC posts adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use social_publish_domain::{
    ChannelType, PublishOutcome, PublishPayload, SocialProvider, SocialPublishError,
    formatting::PlatformRules,
};
use std::time::{Duration, Instant};

use super::{PlatformCredentials, http_client, not_ready, read_body, rejected, transport_error};

const PLATFORM: &str = "LinkedIn";

#[derive(Debug, Clone)]
pub struct LinkedInConfig {
    pub base_url: String,
    pub credentials: PlatformCredentials,
    /// Person or organization URN posts are authored as
    pub author_urn: Option<String>,
    pub visibility: String,
    pub timeout: Duration,
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.linkedin.com/v2".to_string(),
            credentials: PlatformCredentials::missing(),
            author_urn: None,
            visibility: "PUBLIC".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct LinkedInProvider {
    client: Client,
    config: LinkedInConfig,
    rules: PlatformRules,
}

impl LinkedInProvider {
    pub fn new(config: LinkedInConfig) -> Self {
        Self {
            client: http_client(config.timeout),
            config,
            rules: PlatformRules::for_channel(ChannelType::Linkedin),
        }
    }

    fn author(&self) -> Option<&str> {
        self.config
            .author_urn
            .as_deref()
            .map(str::trim)
            .filter(|urn| !urn.is_empty())
    }

    fn share_body(&self, author: &str, payload: &PublishPayload) -> Value {
        let commentary = self
            .rules
            .caption(&payload.content.body, &payload.content.hashtags);

        let share = match payload.media_url.as_deref() {
            Some(url) => json!({
                "shareCommentary": {"text": commentary},
                "shareMediaCategory": "ARTICLE",
                "media": [{
                    "status": "READY",
                    "originalUrl": url,
                    "title": {"text": payload.content.title},
                }],
            }),
            None => json!({
                "shareCommentary": {"text": commentary},
                "shareMediaCategory": "NONE",
            }),
        };

        json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {"com.linkedin.ugc.ShareContent": share},
            "visibility": {"com.linkedin.ugc.MemberNetworkVisibility": self.config.visibility},
        })
    }
}

#[async_trait]
impl SocialProvider for LinkedInProvider {
    fn is_configured(&self) -> bool {
        self.config.credentials.has_client()
    }

    fn is_ready_to_publish(&self) -> bool {
        self.config.credentials.access_token().is_some() && self.author().is_some()
    }

    async fn publish(&self, payload: &PublishPayload) -> Result<PublishOutcome, SocialPublishError> {
        tracing::info!(
            publication_id = %payload.publication_id,
            content_length = payload.content_length(),
            has_media = payload.media_url.is_some(),
            "Publishing to LinkedIn"
        );

        let Some(token) = self.config.credentials.access_token() else {
            tracing::warn!(publication_id = %payload.publication_id, "LinkedIn access token missing");
            return Ok(not_ready(PLATFORM, "missing access token"));
        };
        let Some(author) = self.author() else {
            tracing::warn!(publication_id = %payload.publication_id, "LinkedIn author URN missing");
            return Ok(not_ready(PLATFORM, "missing author URN"));
        };

        let url = format!("{}/ugcPosts", self.config.base_url.trim_end_matches('/'));
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .header("Authorization", format!("Bearer {}", token.expose_secret()))
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&self.share_body(author, payload))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(publication_id = %payload.publication_id, error = %e, "LinkedIn request failed");
                transport_error(PLATFORM, e)
            })?;

        let status = response.status();
        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = read_body(response).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            tracing::warn!(
                publication_id = %payload.publication_id,
                status = status.as_u16(),
                duration_ms = duration_ms,
                "LinkedIn rejected the post"
            );
            return Ok(rejected(PLATFORM, status, body));
        }

        let post_id = body
            .get("id")
            .and_then(Value::as_str)
            .map(String::from)
            .or(header_id);

        let outcome = match post_id {
            Some(id) => {
                let url = format!("https://www.linkedin.com/feed/update/{}/", id);
                PublishOutcome::published(id, Some(url)).with_raw_response(body)
            }
            None => PublishOutcome::failed("LinkedIn response missing post id").with_raw_response(body),
        };

        tracing::info!(
            publication_id = %payload.publication_id,
            success = outcome.success,
            external_id = ?outcome.external_post_id,
            duration_ms = duration_ms,
            "LinkedIn publish finished"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::CredentialSource;
    use social_publish_domain::Content;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String, author_urn: Option<&str>) -> LinkedInProvider {
        LinkedInProvider::new(LinkedInConfig {
            base_url,
            credentials: PlatformCredentials {
                client_id: CredentialSource::value("li-client"),
                client_secret: CredentialSource::value("li-secret"),
                access_token: CredentialSource::value("li-token"),
            },
            author_urn: author_urn.map(String::from),
            ..Default::default()
        })
    }

    fn payload(media_url: Option<&str>) -> PublishPayload {
        PublishPayload {
            channel_id: Uuid::new_v4(),
            content: Content {
                id: Uuid::new_v4(),
                agency_id: "agency-1".to_string(),
                job_id: "job-1".to_string(),
                title: "Site Manager".to_string(),
                body: "Lead a team of 40 on a new build.".to_string(),
                hashtags: vec!["construction".to_string()],
                media_url: media_url.map(String::from),
            },
            media_url: media_url.map(String::from),
            job_id: "job-1".to_string(),
            publication_id: Uuid::new_v4(),
            agency_id: "agency-1".to_string(),
            is_demo: false,
        }
    }

    #[tokio::test]
    async fn test_text_only_post_reads_header_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ugcPosts"))
            .and(header("Authorization", "Bearer li-token"))
            .and(header("X-Restli-Protocol-Version", "2.0.0"))
            .and(body_partial_json(json!({
                "author": "urn:li:organization:42",
                "lifecycleState": "PUBLISHED",
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareCommentary": {"text": "Lead a team of 40 on a new build.\n\n#construction"},
                        "shareMediaCategory": "NONE"
                    }
                }
            })))
            .respond_with(
                ResponseTemplate::new(201).insert_header("x-restli-id", "urn:li:share:7001"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = provider(mock_server.uri(), Some("urn:li:organization:42"))
            .publish(&payload(None))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.external_post_id.as_deref(), Some("urn:li:share:7001"));
        assert_eq!(
            outcome.external_url.as_deref(),
            Some("https://www.linkedin.com/feed/update/urn:li:share:7001/")
        );
    }

    #[tokio::test]
    async fn test_media_becomes_article_share() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ugcPosts"))
            .and(body_partial_json(json!({
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareMediaCategory": "ARTICLE",
                        "media": [{"status": "READY", "originalUrl": "https://jobs.example.com/42"}]
                    }
                }
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "urn:li:share:7002"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = provider(mock_server.uri(), Some("urn:li:person:abc"))
            .publish(&payload(Some("https://jobs.example.com/42")))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.external_post_id.as_deref(), Some("urn:li:share:7002"));
    }

    #[tokio::test]
    async fn test_missing_author_is_not_ready() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let provider = provider(mock_server.uri(), None);
        assert!(provider.is_configured());
        assert!(!provider.is_ready_to_publish());

        let outcome = provider.publish(&payload(None)).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("LinkedIn is not configured: missing author URN")
        );
    }

    #[tokio::test]
    async fn test_server_error_keeps_raw_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ugcPosts"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Duplicate post",
                "status": 422
            })))
            .mount(&mock_server)
            .await;

        let outcome = provider(mock_server.uri(), Some("urn:li:organization:42"))
            .publish(&payload(None))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("LinkedIn API returned HTTP 422: Duplicate post")
        );
        assert_eq!(outcome.raw_response.unwrap()["status"], 422);
    }
}
