//! Audit sinks for terminal publication transitions

use async_trait::async_trait;
use social_publish_domain::{AuditError, AuditEvent, AuditSink};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use time::format_description::well_known::Rfc3339;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only JSON lines audit log
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl JsonlAuditLog {
    pub async fn new(path: PathBuf) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AuditError::Io(e.to_string()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line =
            serde_json::to_string(event).map_err(|e| AuditError::Serialization(e.to_string()))?;

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| AuditError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Audit log stored next to publications in SQLite
#[derive(Debug, Clone)]
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    pub async fn new(pool: SqlitePool) -> Result<Self, AuditError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id TEXT PRIMARY KEY,
                action TEXT NOT NULL,
                publication_id TEXT NOT NULL,
                agency_id TEXT NOT NULL,
                user_id TEXT,
                channel_type TEXT NOT NULL,
                channel_name TEXT NOT NULL,
                event_json TEXT NOT NULL,
                occurred_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Events for one publication, oldest first
    pub async fn events_for(
        &self,
        publication_id: uuid::Uuid,
    ) -> Result<Vec<AuditEvent>, AuditError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT event_json FROM audit_events
            WHERE publication_id = ?
            ORDER BY occurred_at ASC
            "#,
        )
        .bind(publication_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(event_json,)| {
                serde_json::from_str(&event_json)
                    .map_err(|e| AuditError::Serialization(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl AuditSink for SqliteAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let occurred_at = event
            .occurred_at
            .format(&Rfc3339)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;
        let event_json =
            serde_json::to_string(event).map_err(|e| AuditError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO audit_events
            (id, action, publication_id, agency_id, user_id, channel_type, channel_name,
             event_json, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.action.as_str())
        .bind(event.publication_id.to_string())
        .bind(&event.agency_id)
        .bind(&event.user_id)
        .bind(event.channel_type.as_str())
        .bind(&event.channel_name)
        .bind(&event_json)
        .bind(&occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(())
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: StdMutex<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|e| AuditError::Io(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}
