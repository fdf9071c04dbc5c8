//! Pending sweep use case - retries every publishable row for an agency

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};
use uuid::Uuid;

use crate::{
    model::{MAX_PUBLISH_ATTEMPTS, PublishContext, PublishReport},
    ports::{AuditSink, Clock, DemoPolicy, PublicationStore},
    usecases::publish::{PublishError, PublishOrchestrator},
};

/// Configuration for the pending sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum concurrent publish calls
    pub max_concurrent: usize,
    /// Maximum publications picked up per sweep
    pub batch_limit: usize,
    /// Max publish calls per minute (None = unlimited)
    pub rate_limit_per_minute: Option<u32>,
    /// Max publish calls per hour (None = unlimited)
    pub rate_limit_per_hour: Option<u32>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            batch_limit: 50,
            rate_limit_per_minute: None,
            rate_limit_per_hour: None,
        }
    }
}

/// Result of one publication within a sweep
#[derive(Debug)]
pub struct SweepEntry {
    pub publication_id: Uuid,
    pub result: Result<PublishReport, PublishError>,
}

impl SweepEntry {
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(report) if report.success)
    }
}

/// Publishes every DRAFT or retryable FAILED publication of one agency
pub struct PendingSweep<St, A, D, Cl>
where
    St: PublicationStore + ?Sized,
    A: AuditSink + ?Sized,
    D: DemoPolicy + ?Sized,
    Cl: Clock + ?Sized,
{
    orchestrator: Arc<PublishOrchestrator<St, A, D, Cl>>,
    config: SweepConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl<St, A, D, Cl> PendingSweep<St, A, D, Cl>
where
    St: PublicationStore + ?Sized,
    A: AuditSink + ?Sized,
    D: DemoPolicy + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(orchestrator: Arc<PublishOrchestrator<St, A, D, Cl>>, config: SweepConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_minute,
            config.rate_limit_per_hour,
        ));
        Self {
            orchestrator,
            config,
            rate_limiter,
        }
    }

    /// Run one sweep.
    ///
    /// Individual failures are collected per entry; only listing the
    /// candidates can fail the sweep as a whole.
    pub async fn run(
        &self,
        agency_id: &str,
        agency_slug: Option<&str>,
    ) -> Result<Vec<SweepEntry>, PublishError> {
        let ids = self
            .orchestrator
            .store()
            .list_retryable(agency_id, MAX_PUBLISH_ATTEMPTS, self.config.batch_limit)
            .await?;

        if ids.is_empty() {
            tracing::debug!(agency_id = %agency_id, "No pending publications");
            return Ok(vec![]);
        }

        tracing::info!(agency_id = %agency_id, count = ids.len(), "Sweeping pending publications");

        let mut results = Vec::with_capacity(ids.len());
        let max_concurrent = self.config.max_concurrent.max(1);
        let mut tasks: FuturesUnordered<BoxFuture<'_, SweepEntry>> = FuturesUnordered::new();
        let mut ids_iter = ids.into_iter();

        loop {
            while tasks.len() < max_concurrent {
                let Some(publication_id) = ids_iter.next() else {
                    break;
                };
                let mut ctx = PublishContext::new(publication_id, agency_id);
                ctx.agency_slug = agency_slug.map(String::from);
                let rate_limiter = Arc::clone(&self.rate_limiter);
                tasks.push(Box::pin(async move {
                    rate_limiter.acquire().await;
                    let result = self.orchestrator.execute_publish(&ctx).await;
                    SweepEntry {
                        publication_id,
                        result,
                    }
                }));
            }

            let Some(entry) = tasks.next().await else {
                break;
            };
            match &entry.result {
                Err(e) if e.is_control_flow() => tracing::info!(
                    publication_id = %entry.publication_id,
                    code = e.code(),
                    "Publication skipped during sweep"
                ),
                Err(e) => tracing::warn!(
                    publication_id = %entry.publication_id,
                    code = e.code(),
                    error = %e,
                    "Publication not published during sweep"
                ),
                Ok(_) => {}
            }
            results.push(entry);
        }

        tracing::info!(
            agency_id = %agency_id,
            published = results.iter().filter(|e| e.succeeded()).count(),
            total = results.len(),
            "Sweep complete"
        );

        Ok(results)
    }
}

#[derive(Debug)]
struct RateLimiter {
    per_minute: Option<u32>,
    per_hour: Option<u32>,
    state: Mutex<RateLimiterState>,
}

#[derive(Debug)]
struct RateLimiterState {
    minute_window_start: Instant,
    hour_window_start: Instant,
    minute_count: u32,
    hour_count: u32,
}

impl RateLimiter {
    fn new(per_minute: Option<u32>, per_hour: Option<u32>) -> Self {
        let now = Instant::now();
        Self {
            per_minute,
            per_hour,
            state: Mutex::new(RateLimiterState {
                minute_window_start: now,
                hour_window_start: now,
                minute_count: 0,
                hour_count: 0,
            }),
        }
    }

    async fn acquire(&self) {
        if self.per_minute.is_none() && self.per_hour.is_none() {
            return;
        }

        loop {
            let mut state = self.state.lock().await;
            let now = Instant::now();

            if now.duration_since(state.minute_window_start) >= Duration::from_secs(60) {
                state.minute_window_start = now;
                state.minute_count = 0;
            }
            if now.duration_since(state.hour_window_start) >= Duration::from_secs(3600) {
                state.hour_window_start = now;
                state.hour_count = 0;
            }

            let wait_for = window_wait(
                self.per_minute,
                state.minute_count,
                now.duration_since(state.minute_window_start),
                Duration::from_secs(60),
            )
            .max(window_wait(
                self.per_hour,
                state.hour_count,
                now.duration_since(state.hour_window_start),
                Duration::from_secs(3600),
            ));

            if wait_for.is_zero() {
                state.minute_count = state.minute_count.saturating_add(1);
                state.hour_count = state.hour_count.saturating_add(1);
                return;
            }

            drop(state);
            tracing::debug!(wait_ms = wait_for.as_millis() as u64, "Rate limited, waiting");
            sleep(wait_for).await;
        }
    }
}

fn window_wait(limit: Option<u32>, count: u32, elapsed: Duration, window: Duration) -> Duration {
    match limit {
        Some(limit) if count >= limit => window.saturating_sub(elapsed),
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::SlugDemoPolicy;
    use crate::lifecycle::PublicationStatus;
    use crate::model::{
        Channel, ChannelType, Content, Publication, PublicationRecord, PublishOutcome,
        PublishPayload, TerminalUpdate,
    };
    use crate::ports::{AuditError, SocialProvider, SocialPublishError, StoreError, SystemClock};
    use crate::registry::ProviderRegistry;
    use crate::model::AuditEvent;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;

    struct FakeStore {
        records: std::sync::Mutex<HashMap<Uuid, PublicationRecord>>,
    }

    impl FakeStore {
        fn status(&self, id: Uuid) -> PublicationStatus {
            self.records.lock().unwrap()[&id].publication.status
        }
    }

    #[async_trait]
    impl PublicationStore for FakeStore {
        async fn load(
            &self,
            id: Uuid,
            agency_id: &str,
        ) -> Result<Option<PublicationRecord>, StoreError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&id)
                .filter(|r| r.publication.agency_id == agency_id)
                .cloned())
        }

        async fn claim(
            &self,
            id: Uuid,
            _agency_id: &str,
            max_attempts: u32,
            now: OffsetDateTime,
        ) -> Result<Option<Publication>, StoreError> {
            let mut records = self.records.lock().unwrap();
            let publication = &mut records
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?
                .publication;
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
            let publication = &mut records
                .get_mut(&id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?
                .publication;
            publication
                .apply_terminal(&update)
                .map_err(|e| StoreError::InvalidState(e.to_string()))?;
            Ok(publication.clone())
        }

        async fn list_retryable(
            &self,
            agency_id: &str,
            max_attempts: u32,
            limit: usize,
        ) -> Result<Vec<Uuid>, StoreError> {
            let records = self.records.lock().unwrap();
            let mut candidates: Vec<_> = records
                .values()
                .map(|r| &r.publication)
                .filter(|p| p.agency_id == agency_id)
                .filter(|p| p.status.can_claim() && p.attempt_count < max_attempts)
                .collect();
            candidates.sort_by_key(|p| p.created_at);
            Ok(candidates.into_iter().take(limit).map(|p| p.id).collect())
        }
    }

    struct NullAudit;

    #[async_trait]
    impl AuditSink for NullAudit {
        async fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
            Ok(())
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SocialProvider for CountingProvider {
        fn is_configured(&self) -> bool {
            true
        }

        fn is_ready_to_publish(&self) -> bool {
            true
        }

        async fn publish(
            &self,
            payload: &PublishPayload,
        ) -> Result<PublishOutcome, SocialPublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PublishOutcome::published(
                format!("urn:li:share:{}", payload.publication_id),
                None,
            ))
        }
    }

    fn record(status: PublicationStatus, attempts: u32) -> PublicationRecord {
        let now = OffsetDateTime::now_utc();
        let channel = Channel {
            id: Uuid::new_v4(),
            agency_id: "agency-1".to_string(),
            channel_type: ChannelType::Linkedin,
            name: "Company Page".to_string(),
            handle: None,
        };
        let content = Content {
            id: Uuid::new_v4(),
            agency_id: "agency-1".to_string(),
            job_id: "job-1".to_string(),
            title: "Forklift Driver".to_string(),
            body: "Night shifts available".to_string(),
            hashtags: vec![],
            media_url: None,
        };
        let mut publication = Publication::draft("agency-1", "job-1", channel.id, content.id, now);
        publication.status = status;
        publication.attempt_count = attempts;
        PublicationRecord {
            publication,
            channel,
            content,
        }
    }

    fn sweep(
        records: Vec<PublicationRecord>,
        config: SweepConfig,
    ) -> (
        PendingSweep<FakeStore, NullAudit, SlugDemoPolicy, SystemClock>,
        Arc<FakeStore>,
        Arc<CountingProvider>,
    ) {
        let store = Arc::new(FakeStore {
            records: std::sync::Mutex::new(
                records
                    .into_iter()
                    .map(|r| (r.publication.id, r))
                    .collect(),
            ),
        });
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let mut registry = ProviderRegistry::new(Arc::new(SystemClock));
        registry.register_instance(ChannelType::Linkedin, provider.clone());

        let orchestrator = PublishOrchestrator::new(
            Arc::clone(&store),
            Arc::new(registry),
            Arc::new(NullAudit),
            Arc::new(SlugDemoPolicy::default()),
            Arc::new(SystemClock),
        );
        (
            PendingSweep::new(Arc::new(orchestrator), config),
            store,
            provider,
        )
    }

    #[tokio::test]
    async fn test_sweep_publishes_drafts_and_retryable_failures() {
        let draft = record(PublicationStatus::Draft, 0);
        let failed = record(PublicationStatus::Failed, 2);
        let capped = record(PublicationStatus::Failed, MAX_PUBLISH_ATTEMPTS);
        let done = record(PublicationStatus::Published, 1);
        let ids = [
            draft.publication.id,
            failed.publication.id,
            capped.publication.id,
            done.publication.id,
        ];

        let (sweep, store, provider) = sweep(
            vec![draft, failed, capped, done],
            SweepConfig {
                max_concurrent: 2,
                ..Default::default()
            },
        );

        let results = sweep.run("agency-1", None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(SweepEntry::succeeded));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.status(ids[0]), PublicationStatus::Published);
        assert_eq!(store.status(ids[1]), PublicationStatus::Published);
        assert_eq!(store.status(ids[2]), PublicationStatus::Failed);
    }

    #[tokio::test]
    async fn test_sweep_respects_batch_limit() {
        let records: Vec<_> = (0..5)
            .map(|_| record(PublicationStatus::Draft, 0))
            .collect();
        let (sweep, _store, provider) = sweep(
            records,
            SweepConfig {
                batch_limit: 3,
                ..Default::default()
            },
        );

        let results = sweep.run("agency-1", None).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_sweep_for_other_agency_is_empty() {
        let (sweep, _store, provider) =
            sweep(vec![record(PublicationStatus::Draft, 0)], SweepConfig::default());

        let results = sweep.run("agency-2", None).await.unwrap();

        assert!(results.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_waits_for_next_window() {
        let limiter = RateLimiter::new(Some(2), None);
        let started = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));

        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_secs(60));
    }
}
