//! Publish use case - drives one publication through its lifecycle

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use uuid::Uuid;

use crate::{
    lifecycle::{LifecycleError, PublicationEvent, PublicationStatus},
    model::{
        AuditAction, AuditEvent, ChannelType, MAX_PUBLISH_ATTEMPTS, Publication,
        PublicationRecord, PublishContext, PublishOutcome, PublishPayload, PublishReport,
        TerminalUpdate,
    },
    ports::{AuditSink, Clock, DemoPolicy, PublicationStore, SocialPublishError, StoreError},
    registry::ProviderRegistry,
};

/// Errors surfaced to the caller of [`PublishOrchestrator::execute_publish`]
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Publication {0} not found")]
    PublicationNotFound(Uuid),
    #[error("Publication {0} is already being published")]
    PublishingInProgress(Uuid),
    #[error("Publication {id} reached the maximum of {max} publish attempts")]
    MaxAttemptsReached { id: Uuid, max: u32 },
    #[error("No provider registered for channel type {0}")]
    NoProvider(ChannelType),
    #[error("Provider error: {0}")]
    Provider(#[from] SocialPublishError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

impl PublishError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PublishError::PublicationNotFound(_) => "PUBLICATION_NOT_FOUND",
            PublishError::PublishingInProgress(_) => "PUBLISHING_IN_PROGRESS",
            PublishError::MaxAttemptsReached { .. } => "MAX_ATTEMPTS_REACHED",
            PublishError::NoProvider(_) => "NO_PROVIDER",
            PublishError::Provider(_) => "SOCIAL_PUBLISH_ERROR",
            PublishError::Store(_) => "STORE_ERROR",
            PublishError::Lifecycle(_) => "ILLEGAL_TRANSITION",
        }
    }

    /// The request was invalid for the current state; nothing was mutated
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            PublishError::PublicationNotFound(_)
                | PublishError::PublishingInProgress(_)
                | PublishError::MaxAttemptsReached { .. }
                | PublishError::NoProvider(_)
        )
    }
}

/// Publish orchestrator: owns the publication state machine
pub struct PublishOrchestrator<St, A, D, Cl>
where
    St: PublicationStore + ?Sized,
    A: AuditSink + ?Sized,
    D: DemoPolicy + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    registry: Arc<ProviderRegistry>,
    audit: Arc<A>,
    demo_policy: Arc<D>,
    clock: Arc<Cl>,
}

impl<St, A, D, Cl> PublishOrchestrator<St, A, D, Cl>
where
    St: PublicationStore + ?Sized,
    A: AuditSink + ?Sized,
    D: DemoPolicy + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        store: Arc<St>,
        registry: Arc<ProviderRegistry>,
        audit: Arc<A>,
        demo_policy: Arc<D>,
        clock: Arc<Cl>,
    ) -> Self {
        Self {
            store,
            registry,
            audit,
            demo_policy,
            clock,
        }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Publish one publication.
    ///
    /// Guard failures return a control-flow error without touching state.
    /// Once the attempt is claimed every exit persists a terminal status:
    /// a rejected post comes back as `Ok` with `success == false`, an
    /// unexpected provider error is persisted as `FAILED` and returned.
    pub async fn execute_publish(&self, ctx: &PublishContext) -> Result<PublishReport, PublishError> {
        let record = self
            .store
            .load(ctx.publication_id, &ctx.agency_id)
            .await?
            .ok_or(PublishError::PublicationNotFound(ctx.publication_id))?;

        if let Some(report) = check_guards(&record.publication)? {
            tracing::info!(
                publication_id = %ctx.publication_id,
                external_id = ?report.external_id,
                "Publication already published, skipping"
            );
            return Ok(report);
        }

        let channel_type = record.channel.channel_type;
        let provider = self
            .registry
            .get(channel_type)
            .ok_or(PublishError::NoProvider(channel_type))?;

        let is_demo = self
            .demo_policy
            .is_demo(&ctx.agency_id, ctx.agency_slug.as_deref());

        record
            .publication
            .status
            .transition(PublicationEvent::Claim)?;

        let claimed = match self
            .store
            .claim(
                ctx.publication_id,
                &ctx.agency_id,
                MAX_PUBLISH_ATTEMPTS,
                self.clock.now(),
            )
            .await?
        {
            Some(claimed) => claimed,
            None => return self.resolve_lost_claim(ctx).await,
        };

        tracing::info!(
            publication_id = %claimed.id,
            channel_type = %channel_type,
            attempt = claimed.attempt_count,
            is_demo = is_demo,
            "Claimed publish attempt"
        );

        let payload = PublishPayload::for_record(&record, is_demo);
        let started = Instant::now();
        let result = provider.publish(&payload).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Err(error) => {
                tracing::error!(
                    publication_id = %claimed.id,
                    channel_type = %channel_type,
                    duration_ms = duration_ms,
                    error = %error,
                    "Provider raised an unexpected error"
                );
                self.record_failure(&record, ctx, &error.to_string(), true)
                    .await?;
                Err(PublishError::Provider(error))
            }
            Ok(outcome) if outcome.success => {
                let published = self
                    .store
                    .complete(
                        claimed.id,
                        &ctx.agency_id,
                        TerminalUpdate::Published {
                            published_at: self.clock.now(),
                            external_id: outcome.external_post_id.clone(),
                            external_url: outcome.external_url.clone(),
                        },
                    )
                    .await?;

                tracing::info!(
                    publication_id = %published.id,
                    channel_type = %channel_type,
                    external_id = ?published.external_id,
                    is_stub = outcome.is_stub,
                    duration_ms = duration_ms,
                    "Publication published"
                );

                self.emit(AuditEvent {
                    id: Uuid::new_v4(),
                    action: AuditAction::PublicationPublished,
                    publication_id: published.id,
                    agency_id: ctx.agency_id.clone(),
                    user_id: ctx.user_id.clone(),
                    channel_type,
                    channel_name: record.channel.name.clone(),
                    payload: json!({
                        "external_id": published.external_id,
                        "external_url": published.external_url,
                        "is_demo": is_demo,
                        "is_stub": outcome.is_stub,
                    }),
                    occurred_at: self.clock.now(),
                })
                .await;

                Ok(report_for(&published, &outcome, is_demo))
            }
            Ok(outcome) => {
                let message = outcome
                    .error_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Publish failed without an error message".to_string());

                tracing::warn!(
                    publication_id = %claimed.id,
                    channel_type = %channel_type,
                    attempt = claimed.attempt_count,
                    duration_ms = duration_ms,
                    error = %message,
                    "Publish attempt rejected"
                );

                let failed = self.record_failure(&record, ctx, &message, false).await?;
                Ok(report_for(&failed, &outcome, is_demo))
            }
        }
    }

    async fn record_failure(
        &self,
        record: &PublicationRecord,
        ctx: &PublishContext,
        message: &str,
        fatal: bool,
    ) -> Result<Publication, PublishError> {
        let failed = self
            .store
            .complete(
                record.publication.id,
                &ctx.agency_id,
                TerminalUpdate::Failed {
                    error_message: message.to_string(),
                    failed_at: self.clock.now(),
                },
            )
            .await?;

        self.emit(AuditEvent {
            id: Uuid::new_v4(),
            action: AuditAction::PublicationFailed,
            publication_id: failed.id,
            agency_id: ctx.agency_id.clone(),
            user_id: ctx.user_id.clone(),
            channel_type: record.channel.channel_type,
            channel_name: record.channel.name.clone(),
            payload: json!({
                "error": message,
                "attempt_count": failed.attempt_count,
                "fatal": fatal,
            }),
            occurred_at: self.clock.now(),
        })
        .await;

        Ok(failed)
    }

    /// Another caller claimed the attempt between our read and our write
    async fn resolve_lost_claim(&self, ctx: &PublishContext) -> Result<PublishReport, PublishError> {
        tracing::warn!(
            publication_id = %ctx.publication_id,
            "Lost publish claim to a concurrent attempt"
        );

        let current = self
            .store
            .load(ctx.publication_id, &ctx.agency_id)
            .await?
            .ok_or(PublishError::PublicationNotFound(ctx.publication_id))?;

        match check_guards(&current.publication)? {
            Some(report) => Ok(report),
            None => Err(PublishError::PublishingInProgress(ctx.publication_id)),
        }
    }

    async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(&event).await {
            tracing::warn!(
                publication_id = %event.publication_id,
                action = event.action.as_str(),
                error = %e,
                "Failed to record audit event"
            );
        }
    }
}

/// Idempotency and cap checks against the last committed state.
///
/// `Ok(Some(_))` means the publication is already published.
fn check_guards(publication: &Publication) -> Result<Option<PublishReport>, PublishError> {
    match publication.status {
        PublicationStatus::Published => {
            let mut report = PublishReport::from_publication(publication);
            report.already_published = true;
            Ok(Some(report))
        }
        PublicationStatus::Publishing => Err(PublishError::PublishingInProgress(publication.id)),
        _ if publication.attempt_count >= MAX_PUBLISH_ATTEMPTS => {
            Err(PublishError::MaxAttemptsReached {
                id: publication.id,
                max: MAX_PUBLISH_ATTEMPTS,
            })
        }
        _ => Ok(None),
    }
}

fn report_for(publication: &Publication, outcome: &PublishOutcome, is_demo: bool) -> PublishReport {
    let mut report = PublishReport::from_publication(publication);
    report.is_stub = outcome.is_stub;
    report.is_demo = is_demo;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::SlugDemoPolicy;
    use crate::model::{Channel, Content, PublicationRecord};
    use crate::ports::AuditError;
    use crate::ports::SocialProvider;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;
    use tokio::sync::Barrier;

    struct FakeStore {
        records: Mutex<HashMap<Uuid, PublicationRecord>>,
        load_barrier: Option<Barrier>,
        loads: AtomicUsize,
    }

    impl FakeStore {
        fn new(records: Vec<PublicationRecord>) -> Self {
            Self {
                records: Mutex::new(
                    records
                        .into_iter()
                        .map(|r| (r.publication.id, r))
                        .collect(),
                ),
                load_barrier: None,
                loads: AtomicUsize::new(0),
            }
        }

        fn get(&self, id: Uuid) -> Publication {
            self.records.lock().unwrap()[&id].publication.clone()
        }
    }

    #[async_trait]
    impl PublicationStore for FakeStore {
        async fn load(
            &self,
            id: Uuid,
            agency_id: &str,
        ) -> Result<Option<PublicationRecord>, StoreError> {
            let snapshot = self
                .records
                .lock()
                .unwrap()
                .get(&id)
                .filter(|r| r.publication.agency_id == agency_id)
                .cloned();
            let seen = self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = self.load_barrier.as_ref().filter(|_| seen < 2) {
                barrier.wait().await;
            }
            Ok(snapshot)
        }

        async fn claim(
            &self,
            id: Uuid,
            agency_id: &str,
            max_attempts: u32,
            now: OffsetDateTime,
        ) -> Result<Option<Publication>, StoreError> {
            let mut records = self.records.lock().unwrap();
            let Some(record) = records
                .get_mut(&id)
                .filter(|r| r.publication.agency_id == agency_id)
            else {
                return Ok(None);
            };
            let publication = &mut record.publication;
            if !publication.status.can_claim() || publication.attempt_count >= max_attempts {
                return Ok(None);
            }
            publication
                .apply_claim(now)
                .map_err(|e| StoreError::InvalidState(e.to_string()))?;
            Ok(Some(publication.clone()))
        }

        async fn complete(
            &self,
            id: Uuid,
            _agency_id: &str,
            update: TerminalUpdate,
        ) -> Result<Publication, StoreError> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            record
                .publication
                .apply_terminal(&update)
                .map_err(|e| StoreError::InvalidState(e.to_string()))?;
            Ok(record.publication.clone())
        }

        async fn list_retryable(
            &self,
            _agency_id: &str,
            _max_attempts: u32,
            _limit: usize,
        ) -> Result<Vec<Uuid>, StoreError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeAudit {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for FakeAudit {
        async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    enum Script {
        Outcome(PublishOutcome),
        Error,
    }

    struct FakeProvider {
        script: Script,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(outcome: PublishOutcome) -> Arc<Self> {
            Arc::new(Self {
                script: Script::Outcome(outcome),
                calls: AtomicUsize::new(0),
            })
        }

        fn erroring() -> Arc<Self> {
            Arc::new(Self {
                script: Script::Error,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SocialProvider for FakeProvider {
        fn is_configured(&self) -> bool {
            true
        }

        fn is_ready_to_publish(&self) -> bool {
            true
        }

        async fn publish(
            &self,
            _payload: &PublishPayload,
        ) -> Result<PublishOutcome, SocialPublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Outcome(outcome) => Ok(outcome.clone()),
                Script::Error => Err(SocialPublishError::Network("connection reset".to_string())),
            }
        }
    }

    struct FakeClock {
        time: OffsetDateTime,
    }

    impl Clock for FakeClock {
        fn now(&self) -> OffsetDateTime {
            self.time
        }
    }

    type Orchestrator = PublishOrchestrator<FakeStore, FakeAudit, SlugDemoPolicy, FakeClock>;

    fn record(channel_type: ChannelType) -> PublicationRecord {
        let now = OffsetDateTime::now_utc();
        let channel = Channel {
            id: Uuid::new_v4(),
            agency_id: "agency-1".to_string(),
            channel_type,
            name: "Acme Careers".to_string(),
            handle: Some("@acme".to_string()),
        };
        let content = Content {
            id: Uuid::new_v4(),
            agency_id: "agency-1".to_string(),
            job_id: "job-42".to_string(),
            title: "Warehouse Lead".to_string(),
            body: "We are hiring a warehouse lead in Leeds.".to_string(),
            hashtags: vec!["hiring".to_string(), "leeds".to_string()],
            media_url: None,
        };
        PublicationRecord {
            publication: Publication::draft("agency-1", "job-42", channel.id, content.id, now),
            channel,
            content,
        }
    }

    fn orchestrator(
        records: Vec<PublicationRecord>,
        providers: Vec<(ChannelType, Arc<FakeProvider>)>,
    ) -> (Orchestrator, Arc<FakeStore>, Arc<FakeAudit>) {
        let clock = Arc::new(FakeClock {
            time: OffsetDateTime::now_utc(),
        });
        let mut registry = ProviderRegistry::new(Arc::new(FakeClock {
            time: clock.time,
        }));
        for (channel_type, provider) in providers {
            registry.register_instance(channel_type, provider);
        }
        let store = Arc::new(FakeStore::new(records));
        let audit = Arc::new(FakeAudit::default());
        let demo = Arc::new(SlugDemoPolicy::new(vec![], vec!["demo-".to_string()]));

        (
            PublishOrchestrator::new(
                Arc::clone(&store),
                Arc::new(registry),
                Arc::clone(&audit),
                demo,
                clock,
            ),
            store,
            audit,
        )
    }

    #[tokio::test]
    async fn test_demo_tenant_tiktok_publishes_stub() {
        let record = record(ChannelType::Tiktok);
        let id = record.publication.id;
        let provider = FakeProvider::erroring();
        let (orchestrator, store, audit) =
            orchestrator(vec![record], vec![(ChannelType::Tiktok, provider.clone())]);

        let ctx = PublishContext::new(id, "agency-1").with_agency_slug("demo-acme");
        let report = orchestrator.execute_publish(&ctx).await.unwrap();

        assert!(report.success);
        assert!(report.is_stub);
        assert!(report.is_demo);
        assert_eq!(report.status, PublicationStatus::Published);
        assert_eq!(report.attempt_count, 1);
        assert!(
            report
                .external_url
                .as_deref()
                .unwrap()
                .starts_with("https://www.tiktok.com/@demo/video/demo_tiktok_")
        );
        assert_eq!(provider.calls(), 0);

        let stored = store.get(id);
        assert!(stored.published_at.is_some());
        assert!(stored.error_message.is_none());

        let events = audit.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::PublicationPublished);
        assert_eq!(events[0].payload["is_stub"], true);
    }

    #[tokio::test]
    async fn test_linkedin_success_stores_external_ids() {
        let record = record(ChannelType::Linkedin);
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::published(
            "urn:li:share:123",
            Some("https://www.linkedin.com/feed/update/urn:li:share:123/".to_string()),
        ));
        let (orchestrator, store, _audit) =
            orchestrator(vec![record], vec![(ChannelType::Linkedin, provider.clone())]);

        let ctx = PublishContext::new(id, "agency-1").with_user("user-7");
        let report = orchestrator.execute_publish(&ctx).await.unwrap();

        assert!(report.success);
        assert!(!report.is_stub);
        let stored = store.get(id);
        assert_eq!(stored.status, PublicationStatus::Published);
        assert_eq!(stored.external_id.as_deref(), Some("urn:li:share:123"));
        assert!(stored.external_url.unwrap().contains("urn:li:share:123"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_already_published_is_idempotent() {
        let record = record(ChannelType::Linkedin);
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::published("urn:li:share:9", None));
        let (orchestrator, store, audit) =
            orchestrator(vec![record], vec![(ChannelType::Linkedin, provider.clone())]);
        let ctx = PublishContext::new(id, "agency-1");

        let first = orchestrator.execute_publish(&ctx).await.unwrap();
        let second = orchestrator.execute_publish(&ctx).await.unwrap();

        assert!(!first.already_published);
        assert!(second.already_published);
        assert!(second.success);
        assert_eq!(second.external_id, first.external_id);
        assert_eq!(second.external_url, first.external_url);
        assert_eq!(store.get(id).attempt_count, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(audit.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attempt_cap_blocks_without_mutation() {
        let mut record = record(ChannelType::Linkedin);
        record.publication.status = PublicationStatus::Failed;
        record.publication.attempt_count = MAX_PUBLISH_ATTEMPTS;
        record.publication.error_message = Some("HTTP 500".to_string());
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::published("x", None));
        let (orchestrator, store, _audit) =
            orchestrator(vec![record], vec![(ChannelType::Linkedin, provider.clone())]);

        let err = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "MAX_ATTEMPTS_REACHED");
        assert!(err.is_control_flow());
        let stored = store.get(id);
        assert_eq!(stored.attempt_count, MAX_PUBLISH_ATTEMPTS);
        assert_eq!(stored.status, PublicationStatus::Failed);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_outcome_marks_failed_and_counts_attempt() {
        let record = record(ChannelType::Instagram);
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::failed(
            "Instagram requires an image or video URL",
        ));
        let (orchestrator, store, audit) =
            orchestrator(vec![record], vec![(ChannelType::Instagram, provider)]);

        let report = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap();

        assert!(!report.success);
        assert!(report.error_message.unwrap().contains("image or video"));
        let stored = store.get(id);
        assert_eq!(stored.status, PublicationStatus::Failed);
        assert_eq!(stored.attempt_count, 1);

        let events = audit.events.lock().unwrap();
        assert_eq!(events[0].action, AuditAction::PublicationFailed);
        assert_eq!(events[0].payload["attempt_count"], 1);
        assert_eq!(events[0].payload["fatal"], false);
    }

    #[tokio::test]
    async fn test_rejection_without_message_still_records_error() {
        let record = record(ChannelType::Linkedin);
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::default());
        let (orchestrator, store, _audit) =
            orchestrator(vec![record], vec![(ChannelType::Linkedin, provider)]);

        orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap();

        let stored = store.get(id);
        assert_eq!(stored.status, PublicationStatus::Failed);
        assert!(stored.error_message.is_some());
    }

    #[tokio::test]
    async fn test_provider_error_is_persisted_and_rethrown() {
        let record = record(ChannelType::Linkedin);
        let id = record.publication.id;
        let (orchestrator, store, audit) = orchestrator(
            vec![record],
            vec![(ChannelType::Linkedin, FakeProvider::erroring())],
        );

        let err = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Provider(_)));
        assert!(!err.is_control_flow());
        let stored = store.get(id);
        assert_eq!(stored.status, PublicationStatus::Failed);
        assert_eq!(stored.attempt_count, 1);
        assert!(stored.error_message.unwrap().contains("connection reset"));
        assert_eq!(audit.events.lock().unwrap()[0].payload["fatal"], true);
    }

    #[tokio::test]
    async fn test_failed_publication_can_be_retried() {
        let mut record = record(ChannelType::Linkedin);
        record.publication.status = PublicationStatus::Failed;
        record.publication.attempt_count = 2;
        record.publication.error_message = Some("HTTP 503".to_string());
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::published("urn:li:share:5", None));
        let (orchestrator, store, _audit) =
            orchestrator(vec![record], vec![(ChannelType::Linkedin, provider)]);

        let report = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap();

        assert!(report.success);
        let stored = store.get(id);
        assert_eq!(stored.attempt_count, 3);
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn test_in_flight_publication_is_rejected() {
        let mut record = record(ChannelType::Tiktok);
        record.publication.status = PublicationStatus::Publishing;
        record.publication.attempt_count = 1;
        let id = record.publication.id;
        let (orchestrator, store, _audit) = orchestrator(
            vec![record],
            vec![(ChannelType::Tiktok, FakeProvider::erroring())],
        );

        let err = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PUBLISHING_IN_PROGRESS");
        assert_eq!(store.get(id).attempt_count, 1);
    }

    #[tokio::test]
    async fn test_other_agency_cannot_see_publication() {
        let record = record(ChannelType::Tiktok);
        let id = record.publication.id;
        let (orchestrator, store, _audit) = orchestrator(
            vec![record],
            vec![(ChannelType::Tiktok, FakeProvider::erroring())],
        );

        let err = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-2"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PUBLICATION_NOT_FOUND");
        assert_eq!(store.get(id).status, PublicationStatus::Draft);
    }

    #[tokio::test]
    async fn test_missing_provider_does_not_claim() {
        let record = record(ChannelType::Instagram);
        let id = record.publication.id;
        let (orchestrator, store, _audit) = orchestrator(
            vec![record],
            vec![(ChannelType::Tiktok, FakeProvider::erroring())],
        );

        let err = orchestrator
            .execute_publish(&PublishContext::new(id, "agency-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::NoProvider(ChannelType::Instagram)));
        let stored = store.get(id);
        assert_eq!(stored.status, PublicationStatus::Draft);
        assert_eq!(stored.attempt_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_publish_once() {
        let record = record(ChannelType::Linkedin);
        let id = record.publication.id;
        let provider = FakeProvider::returning(PublishOutcome::published("urn:li:share:1", None));
        let (orchestrator, _store, _audit) =
            orchestrator(vec![], vec![(ChannelType::Linkedin, provider.clone())]);

        // Both callers read DRAFT before either claims.
        let store = Arc::new(FakeStore {
            load_barrier: Some(Barrier::new(2)),
            ..FakeStore::new(vec![record])
        });
        let orchestrator = PublishOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&orchestrator.registry),
            Arc::clone(&orchestrator.audit),
            Arc::clone(&orchestrator.demo_policy),
            Arc::clone(&orchestrator.clock),
        );

        let ctx = PublishContext::new(id, "agency-1");
        let (a, b) = tokio::join!(
            orchestrator.execute_publish(&ctx),
            orchestrator.execute_publish(&ctx)
        );

        let fresh = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Ok(report) if !report.already_published))
            .count();
        assert_eq!(fresh, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(store.get(id).attempt_count, 1);
    }
}
