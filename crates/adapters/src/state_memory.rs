//! In-memory publication store for testing and offline mode

use async_trait::async_trait;
use social_publish_domain::{
    Channel, Content, Publication, PublicationRecord, PublicationStore, StoreError,
    TerminalUpdate,
};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    channels: HashMap<Uuid, Channel>,
    contents: HashMap<Uuid, Content>,
    publications: HashMap<Uuid, Publication>,
}

/// In-memory publication store implementation
#[derive(Default)]
pub struct InMemoryPublicationStore {
    tables: RwLock<Tables>,
}

impl InMemoryPublicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_channel(&self, channel: Channel) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.channels.insert(channel.id, channel);
        Ok(())
    }

    pub fn insert_content(&self, content: Content) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.contents.insert(content.id, content);
        Ok(())
    }

    pub fn insert_publication(&self, publication: Publication) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.publications.insert(publication.id, publication);
        Ok(())
    }

    /// Current stored state of a publication, unscoped
    pub fn get(&self, id: Uuid) -> Result<Option<Publication>, StoreError> {
        Ok(self.read()?.publications.get(&id).cloned())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn scoped<'a>(
    publications: &'a mut HashMap<Uuid, Publication>,
    id: Uuid,
    agency_id: &str,
) -> Option<&'a mut Publication> {
    publications
        .get_mut(&id)
        .filter(|p| p.agency_id == agency_id)
}

#[async_trait]
impl PublicationStore for InMemoryPublicationStore {
    async fn load(
        &self,
        id: Uuid,
        agency_id: &str,
    ) -> Result<Option<PublicationRecord>, StoreError> {
        let tables = self.read()?;

        let Some(publication) = tables
            .publications
            .get(&id)
            .filter(|p| p.agency_id == agency_id)
        else {
            return Ok(None);
        };

        let channel = tables
            .channels
            .get(&publication.channel_id)
            .filter(|c| c.agency_id == agency_id)
            .ok_or_else(|| StoreError::NotFound(format!("channel {}", publication.channel_id)))?;
        let content = tables
            .contents
            .get(&publication.content_id)
            .filter(|c| c.agency_id == agency_id)
            .ok_or_else(|| StoreError::NotFound(format!("content {}", publication.content_id)))?;

        Ok(Some(PublicationRecord {
            publication: publication.clone(),
            channel: channel.clone(),
            content: content.clone(),
        }))
    }

    async fn claim(
        &self,
        id: Uuid,
        agency_id: &str,
        max_attempts: u32,
        now: OffsetDateTime,
    ) -> Result<Option<Publication>, StoreError> {
        let mut tables = self.write()?;

        let Some(publication) = scoped(&mut tables.publications, id, agency_id) else {
            return Ok(None);
        };
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
        agency_id: &str,
        update: TerminalUpdate,
    ) -> Result<Publication, StoreError> {
        let mut tables = self.write()?;

        let publication = scoped(&mut tables.publications, id, agency_id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut next = publication.clone();
        next.apply_terminal(&update)
            .map_err(|e| StoreError::InvalidState(e.to_string()))?;
        *publication = next.clone();

        Ok(next)
    }

    async fn list_retryable(
        &self,
        agency_id: &str,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.read()?;

        let mut candidates: Vec<&Publication> = tables
            .publications
            .values()
            .filter(|p| p.agency_id == agency_id)
            .filter(|p| p.status.can_claim() && p.attempt_count < max_attempts)
            .collect();
        candidates.sort_by_key(|p| p.created_at);

        Ok(candidates.into_iter().take(limit).map(|p| p.id).collect())
    }
}
