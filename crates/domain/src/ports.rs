//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    AuditEvent, Publication, PublicationRecord, PublishOutcome, PublishPayload, TerminalUpdate,
};

/// Unexpected failure inside a provider call.
///
/// Ordinary rejections (missing media, non-2xx, not configured) are returned
/// as a negative [`PublishOutcome`] instead.
#[derive(Debug, Error)]
pub enum SocialPublishError {
    #[error("Network error: {0}")]
    Network(String),
}

/// Port implemented by every platform adapter
#[async_trait]
pub trait SocialProvider: Send + Sync {
    /// OAuth client credentials are present in configuration
    fn is_configured(&self) -> bool;

    /// A usable access token is present; gates any live call
    fn is_ready_to_publish(&self) -> bool;

    /// Publish the payload to the platform
    async fn publish(&self, payload: &PublishPayload) -> Result<PublishOutcome, SocialPublishError>;
}

/// Error type for publication store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Port for persisting publication state.
///
/// Every lookup is scoped by `(id, agency_id)`.
#[async_trait]
pub trait PublicationStore: Send + Sync {
    /// Load a publication with its channel and content
    async fn load(
        &self,
        id: Uuid,
        agency_id: &str,
    ) -> Result<Option<PublicationRecord>, StoreError>;

    /// Atomically claim an attempt.
    ///
    /// Applies `status = PUBLISHING`, `attempt_count + 1` and
    /// `last_attempt_at = now` only if the row is still claimable and below
    /// `max_attempts`. Returns `None` when another caller won the race.
    async fn claim(
        &self,
        id: Uuid,
        agency_id: &str,
        max_attempts: u32,
        now: OffsetDateTime,
    ) -> Result<Option<Publication>, StoreError>;

    /// Write the terminal status of a claimed attempt
    async fn complete(
        &self,
        id: Uuid,
        agency_id: &str,
        update: TerminalUpdate,
    ) -> Result<Publication, StoreError>;

    /// Ids of publications that can still be attempted, oldest first
    async fn list_retryable(
        &self,
        agency_id: &str,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError>;
}

/// Error type for audit sink operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Write-only sink for terminal-transition audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Decides whether an agency is a sandboxed demo tenant
pub trait DemoPolicy: Send + Sync {
    fn is_demo(&self, agency_id: &str, agency_slug: Option<&str>) -> bool;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
