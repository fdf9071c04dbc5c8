//! Demo/sandbox support: fabricated outcomes and the provider decorator

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::model::{ChannelType, PublishOutcome, PublishPayload};
use crate::ports::{Clock, DemoPolicy, SocialProvider, SocialPublishError};

/// Fabricate a successful outcome without contacting any platform.
///
/// The shape is fixed; the id embeds the current unix time in milliseconds.
pub fn demo_outcome(
    channel_type: ChannelType,
    payload: &PublishPayload,
    now: OffsetDateTime,
) -> PublishOutcome {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let external_post_id = format!("demo_{}_{}", channel_type.platform(), millis);
    let external_url = demo_url(channel_type, &external_post_id);

    tracing::debug!(
        platform = channel_type.platform(),
        publication_id = %payload.publication_id,
        external_post_id = %external_post_id,
        "Generated demo outcome"
    );

    PublishOutcome {
        success: true,
        external_post_id: Some(external_post_id),
        external_url: Some(external_url),
        error_message: None,
        raw_response: None,
        is_stub: true,
    }
}

/// Platform-shaped fake URL for a demo post id
pub fn demo_url(channel_type: ChannelType, external_post_id: &str) -> String {
    match channel_type {
        ChannelType::Tiktok => format!("https://www.tiktok.com/@demo/video/{}", external_post_id),
        ChannelType::Instagram => format!("https://www.instagram.com/p/{}/", external_post_id),
        ChannelType::Linkedin => {
            format!("https://www.linkedin.com/feed/update/{}/", external_post_id)
        }
    }
}

/// Wraps an adapter so demo payloads never reach it
pub struct DemoGuard {
    channel_type: ChannelType,
    inner: Arc<dyn SocialProvider>,
    clock: Arc<dyn Clock>,
}

impl DemoGuard {
    pub fn new(
        channel_type: ChannelType,
        inner: Arc<dyn SocialProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            channel_type,
            inner,
            clock,
        }
    }
}

#[async_trait]
impl SocialProvider for DemoGuard {
    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    fn is_ready_to_publish(&self) -> bool {
        self.inner.is_ready_to_publish()
    }

    async fn publish(&self, payload: &PublishPayload) -> Result<PublishOutcome, SocialPublishError> {
        if payload.is_demo {
            return Ok(demo_outcome(self.channel_type, payload, self.clock.now()));
        }
        self.inner.publish(payload).await
    }
}

/// Slug-based demo tenant detection
#[derive(Debug, Clone, Default)]
pub struct SlugDemoPolicy {
    /// Exact agency slugs treated as demo tenants
    pub slugs: Vec<String>,
    /// Slug prefixes treated as demo tenants (e.g. `demo-`)
    pub prefixes: Vec<String>,
}

impl SlugDemoPolicy {
    pub fn new(slugs: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { slugs, prefixes }
    }
}

impl DemoPolicy for SlugDemoPolicy {
    fn is_demo(&self, _agency_id: &str, agency_slug: Option<&str>) -> bool {
        let Some(slug) = agency_slug.map(|s| s.trim().to_lowercase()) else {
            return false;
        };
        if slug.is_empty() {
            return false;
        }

        self.slugs.iter().any(|s| s.to_lowercase() == slug)
            || self
                .prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .any(|p| slug.starts_with(&p.to_lowercase()))
    }
}
