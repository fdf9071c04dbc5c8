//! Domain models and value objects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::lifecycle::{LifecycleError, PublicationEvent, PublicationStatus};

/// Maximum number of claimed publish attempts per publication
pub const MAX_PUBLISH_ATTEMPTS: u32 = 5;

/// Social platform a channel publishes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    Tiktok,
    Instagram,
    Linkedin,
}

impl ChannelType {
    pub const ALL: [ChannelType; 3] = [
        ChannelType::Tiktok,
        ChannelType::Instagram,
        ChannelType::Linkedin,
    ];

    /// Stored/wire representation (e.g. `TIKTOK`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Tiktok => "TIKTOK",
            ChannelType::Instagram => "INSTAGRAM",
            ChannelType::Linkedin => "LINKEDIN",
        }
    }

    /// Lowercase platform tag used in fabricated identifiers and logs
    pub fn platform(&self) -> &'static str {
        match self {
            ChannelType::Tiktok => "tiktok",
            ChannelType::Instagram => "instagram",
            ChannelType::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown channel type: {0}")]
pub struct UnknownChannelType(pub String);

impl FromStr for ChannelType {
    type Err = UnknownChannelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiktok" => Ok(ChannelType::Tiktok),
            "instagram" => Ok(ChannelType::Instagram),
            "linkedin" => Ok(ChannelType::Linkedin),
            _ => Err(UnknownChannelType(s.to_string())),
        }
    }
}

/// A configured destination account for one platform, owned by an agency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub agency_id: String,
    pub channel_type: ChannelType,
    /// Display name shown in the admin UI and audit trail
    pub name: String,
    /// Platform handle, if known
    pub handle: Option<String>,
}

/// Generated marketing content for a job posting.
///
/// Content is immutable once a publication references it; edits produce a
/// new content row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub agency_id: String,
    pub job_id: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Image or video to attach, if the content has one
    pub media_url: Option<String>,
}

/// Tracked unit of work: one piece of content pushed to one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: Uuid,
    pub agency_id: String,
    pub job_id: String,
    pub channel_id: Uuid,
    pub content_id: Uuid,
    pub status: PublicationStatus,
    pub attempt_count: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_attempt_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Publication {
    /// Create a new draft publication
    pub fn draft(
        agency_id: impl Into<String>,
        job_id: impl Into<String>,
        channel_id: Uuid,
        content_id: Uuid,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agency_id: agency_id.into(),
            job_id: job_id.into(),
            channel_id,
            content_id,
            status: PublicationStatus::Draft,
            attempt_count: 0,
            last_attempt_at: None,
            published_at: None,
            external_id: None,
            external_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a new attempt may be claimed from the current state
    pub fn is_retryable(&self) -> bool {
        self.status.can_claim() && self.attempt_count < MAX_PUBLISH_ATTEMPTS
    }

    /// Start an attempt: `PUBLISHING`, one more attempt, stamped with `now`
    pub fn apply_claim(&mut self, now: OffsetDateTime) -> Result<(), LifecycleError> {
        self.status = self.status.transition(PublicationEvent::Claim)?;
        self.attempt_count += 1;
        self.last_attempt_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Fold the terminal result of a claimed attempt into the publication
    pub fn apply_terminal(&mut self, update: &TerminalUpdate) -> Result<(), LifecycleError> {
        self.status = self.status.transition(update.event())?;
        match update {
            TerminalUpdate::Published {
                published_at,
                external_id,
                external_url,
            } => {
                self.published_at = Some(*published_at);
                self.external_id = external_id.clone();
                self.external_url = external_url.clone();
                self.error_message = None;
                self.updated_at = *published_at;
            }
            TerminalUpdate::Failed {
                error_message,
                failed_at,
            } => {
                self.error_message = Some(error_message.clone());
                self.updated_at = *failed_at;
            }
        }
        Ok(())
    }
}

/// Terminal write applied after a claimed attempt
#[derive(Debug, Clone)]
pub enum TerminalUpdate {
    Published {
        published_at: OffsetDateTime,
        external_id: Option<String>,
        external_url: Option<String>,
    },
    Failed {
        error_message: String,
        failed_at: OffsetDateTime,
    },
}

impl TerminalUpdate {
    pub fn event(&self) -> PublicationEvent {
        match self {
            TerminalUpdate::Published { .. } => PublicationEvent::Succeed,
            TerminalUpdate::Failed { .. } => PublicationEvent::Fail,
        }
    }
}

/// A publication loaded together with its channel and content relations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub publication: Publication,
    pub channel: Channel,
    pub content: Content,
}

/// Everything an adapter needs to publish one piece of content
#[derive(Debug, Clone)]
pub struct PublishPayload {
    pub channel_id: Uuid,
    pub content: Content,
    pub media_url: Option<String>,
    pub job_id: String,
    pub publication_id: Uuid,
    pub agency_id: String,
    /// Sandboxed tenant: never contact the platform
    pub is_demo: bool,
}

impl PublishPayload {
    /// Build the payload for a loaded publication
    pub fn for_record(record: &PublicationRecord, is_demo: bool) -> Self {
        Self {
            channel_id: record.channel.id,
            content: record.content.clone(),
            media_url: record
                .content
                .media_url
                .as_ref()
                .filter(|url| !url.trim().is_empty())
                .cloned(),
            job_id: record.publication.job_id.clone(),
            publication_id: record.publication.id,
            agency_id: record.publication.agency_id.clone(),
            is_demo,
        }
    }

    /// Character count of the body, used for entry logging
    pub fn content_length(&self) -> usize {
        self.content.body.chars().count()
    }
}

/// Result of a single adapter publish call.
///
/// Folded into the publication by the orchestrator; never stored directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub success: bool,
    pub external_post_id: Option<String>,
    pub external_url: Option<String>,
    pub error_message: Option<String>,
    /// Platform response kept for debugging, never shown to end users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
    /// Fabricated by the demo generator
    pub is_stub: bool,
}

impl PublishOutcome {
    pub fn published(external_post_id: impl Into<String>, external_url: Option<String>) -> Self {
        Self {
            success: true,
            external_post_id: Some(external_post_id.into()),
            external_url,
            ..Default::default()
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    pub fn with_raw_response(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }
}

/// Caller context for a publish request (already authorized upstream)
#[derive(Debug, Clone)]
pub struct PublishContext {
    pub publication_id: Uuid,
    pub agency_id: String,
    pub agency_slug: Option<String>,
    pub user_id: Option<String>,
}

impl PublishContext {
    pub fn new(publication_id: Uuid, agency_id: impl Into<String>) -> Self {
        Self {
            publication_id,
            agency_id: agency_id.into(),
            agency_slug: None,
            user_id: None,
        }
    }

    pub fn with_agency_slug(mut self, slug: impl Into<String>) -> Self {
        self.agency_slug = Some(slug.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Result returned to the caller of `execute_publish`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    pub publication_id: Uuid,
    pub success: bool,
    pub status: PublicationStatus,
    pub attempt_count: u32,
    pub external_id: Option<String>,
    pub external_url: Option<String>,
    /// Human-readable failure reason, safe to display
    pub error_message: Option<String>,
    pub is_stub: bool,
    pub is_demo: bool,
    /// The publication was already published; no attempt was made
    pub already_published: bool,
}

impl PublishReport {
    /// Report derived from the stored state of a publication
    pub fn from_publication(publication: &Publication) -> Self {
        Self {
            publication_id: publication.id,
            success: publication.status == PublicationStatus::Published,
            status: publication.status,
            attempt_count: publication.attempt_count,
            external_id: publication.external_id.clone(),
            external_url: publication.external_url.clone(),
            error_message: publication.error_message.clone(),
            is_stub: false,
            is_demo: false,
            already_published: false,
        }
    }
}

/// Kind of audit event emitted on a terminal transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    PublicationPublished,
    PublicationFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PublicationPublished => "PUBLICATION_PUBLISHED",
            AuditAction::PublicationFailed => "PUBLICATION_FAILED",
        }
    }
}

/// Write-only audit record for one terminal transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub action: AuditAction,
    pub publication_id: Uuid,
    pub agency_id: String,
    pub user_id: Option<String>,
    pub channel_type: ChannelType,
    pub channel_name: String,
    /// Outcome-specific details (url on success, error and attempts on failure)
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}
