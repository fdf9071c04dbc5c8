//! Provider registry mapping channel types to adapters
//!
//! Built once at startup and injected into the orchestrator. Adapters are
//! constructed on first use and shared afterwards; every adapter is wrapped in
//! a [`DemoGuard`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::demo::DemoGuard;
use crate::model::ChannelType;
use crate::ports::{Clock, SocialProvider};

type ProviderFactory = Box<dyn Fn() -> Arc<dyn SocialProvider> + Send + Sync>;

struct Entry {
    factory: ProviderFactory,
    instance: OnceLock<Arc<dyn SocialProvider>>,
}

pub struct ProviderRegistry {
    clock: Arc<dyn Clock>,
    entries: HashMap<ChannelType, Entry>,
}

impl ProviderRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: HashMap::new(),
        }
    }

    /// Register a lazily constructed adapter, replacing any previous entry
    pub fn register<F, P>(&mut self, channel_type: ChannelType, factory: F) -> &mut Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: SocialProvider + 'static,
    {
        let clock = Arc::clone(&self.clock);
        let factory: ProviderFactory = Box::new(move || -> Arc<dyn SocialProvider> {
            tracing::debug!(channel_type = %channel_type, "Constructing provider");
            let inner: Arc<dyn SocialProvider> = Arc::new(factory());
            Arc::new(DemoGuard::new(channel_type, inner, Arc::clone(&clock)))
        });

        self.entries.insert(
            channel_type,
            Entry {
                factory,
                instance: OnceLock::new(),
            },
        );
        self
    }

    /// Register an already constructed adapter
    pub fn register_instance(
        &mut self,
        channel_type: ChannelType,
        provider: Arc<dyn SocialProvider>,
    ) -> &mut Self {
        let guarded: Arc<dyn SocialProvider> = Arc::new(DemoGuard::new(
            channel_type,
            provider,
            Arc::clone(&self.clock),
        ));
        let instance = OnceLock::new();
        let _ = instance.set(Arc::clone(&guarded));

        self.entries.insert(
            channel_type,
            Entry {
                factory: Box::new(move || -> Arc<dyn SocialProvider> {
                    Arc::clone(&guarded)
                }),
                instance,
            },
        );
        self
    }

    /// Resolve the adapter for a channel type, constructing it on first use
    pub fn get(&self, channel_type: ChannelType) -> Option<Arc<dyn SocialProvider>> {
        let entry = self.entries.get(&channel_type)?;
        Some(Arc::clone(entry.instance.get_or_init(|| (entry.factory)())))
    }

    /// Registered channel types in a stable order
    pub fn channel_types(&self) -> Vec<ChannelType> {
        ChannelType::ALL
            .into_iter()
            .filter(|ct| self.entries.contains_key(ct))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Content, PublishOutcome, PublishPayload};
    use crate::ports::{SocialPublishError, SystemClock};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct NoopProvider;

    #[async_trait]
    impl SocialProvider for NoopProvider {
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
            Ok(PublishOutcome::published("real-id", None))
        }
    }

    fn demo_payload() -> PublishPayload {
        PublishPayload {
            channel_id: Uuid::new_v4(),
            content: Content {
                id: Uuid::new_v4(),
                agency_id: "agency-1".to_string(),
                job_id: "job-1".to_string(),
                title: "Title".to_string(),
                body: "Body".to_string(),
                hashtags: vec![],
                media_url: None,
            },
            media_url: None,
            job_id: "job-1".to_string(),
            publication_id: Uuid::new_v4(),
            agency_id: "agency-1".to_string(),
            is_demo: true,
        }
    }

    #[test]
    fn test_construction_is_lazy_and_memoized() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&constructed);

        let mut registry = ProviderRegistry::new(Arc::new(SystemClock));
        registry.register(ChannelType::Linkedin, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            NoopProvider
        });

        assert_eq!(constructed.load(Ordering::SeqCst), 0);

        let first = registry.get(ChannelType::Linkedin).unwrap();
        let second = registry.get(ChannelType::Linkedin).unwrap();

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unregistered_channel_type_resolves_to_none() {
        let mut registry = ProviderRegistry::new(Arc::new(SystemClock));
        registry.register(ChannelType::Tiktok, || NoopProvider);

        assert!(registry.get(ChannelType::Instagram).is_none());
        assert_eq!(registry.channel_types(), vec![ChannelType::Tiktok]);
    }

    #[tokio::test]
    async fn test_registered_providers_are_demo_guarded() {
        let mut registry = ProviderRegistry::new(Arc::new(SystemClock));
        registry.register_instance(ChannelType::Linkedin, Arc::new(NoopProvider));

        let provider = registry.get(ChannelType::Linkedin).unwrap();
        let outcome = provider.publish(&demo_payload()).await.unwrap();

        assert!(outcome.is_stub);
        assert!(
            outcome
                .external_post_id
                .unwrap()
                .starts_with("demo_linkedin_")
        );
    }
}
