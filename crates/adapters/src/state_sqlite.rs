//! SQLite publication store implementation

use async_trait::async_trait;
use social_publish_domain::{
    Channel, ChannelType, Content, Publication, PublicationRecord, PublicationStatus,
    PublicationStore, StoreError, TerminalUpdate,
};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqlitePoolOptions, sqlite::SqliteRow};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

const PUBLICATION_COLUMNS: &str = "p.id, p.agency_id, p.job_id, p.channel_id, p.content_id, \
     p.status, p.attempt_count, p.last_attempt_at, p.published_at, p.external_id, \
     p.external_url, p.error_message, p.created_at, p.updated_at";

/// SQLite-backed publication store
pub struct SqlitePublicationStore {
    pool: SqlitePool,
}

impl SqlitePublicationStore {
    /// Open the store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Connection pool, shared with the SQLite audit log
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channels (
                id TEXT PRIMARY KEY,
                agency_id TEXT NOT NULL,
                channel_type TEXT NOT NULL,
                name TEXT NOT NULL,
                handle TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contents (
                id TEXT PRIMARY KEY,
                agency_id TEXT NOT NULL,
                job_id TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                hashtags TEXT NOT NULL,
                media_url TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publications (
                id TEXT PRIMARY KEY,
                agency_id TEXT NOT NULL,
                job_id TEXT NOT NULL,
                channel_id TEXT NOT NULL REFERENCES channels(id),
                content_id TEXT NOT NULL REFERENCES contents(id),
                status TEXT NOT NULL,
                attempt_count INTEGER NOT NULL DEFAULT 0,
                last_attempt_at TEXT,
                published_at TEXT,
                external_id TEXT,
                external_url TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_publications_pending
            ON publications(agency_id, status, created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    pub async fn create_channel(&self, channel: &Channel) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO channels (id, agency_id, channel_type, name, handle) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(channel.id.to_string())
        .bind(&channel.agency_id)
        .bind(channel.channel_type.as_str())
        .bind(&channel.name)
        .bind(&channel.handle)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    pub async fn create_content(&self, content: &Content) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_content(&mut conn, content).await
    }

    /// Insert a publication; the channel and content must belong to the same agency
    pub async fn create_publication(&self, publication: &Publication) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_publication(&mut conn, publication).await
    }

    /// Store content and its draft publication in one transaction.
    ///
    /// Nothing is written when the channel does not belong to the agency.
    pub async fn create_draft(
        &self,
        content: &Content,
        publication: &Publication,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        insert_content(&mut tx, content).await?;
        insert_publication(&mut tx, publication).await?;
        tx.commit().await.map_err(db_err)
    }

    /// Publications of one agency, newest first, optionally filtered by status
    pub async fn list(
        &self,
        agency_id: &str,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<Publication>, StoreError> {
        let sql = format!(
            "SELECT {} FROM publications p WHERE p.agency_id = ? AND (? IS NULL OR p.status = ?) \
             ORDER BY p.created_at DESC",
            PUBLICATION_COLUMNS
        );
        let status = status.map(|s| s.as_str());

        let rows = sqlx::query(&sql)
            .bind(agency_id)
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(publication_from_row).collect()
    }

    async fn fetch_publication(
        &self,
        id: Uuid,
        agency_id: &str,
    ) -> Result<Option<Publication>, StoreError> {
        let sql = format!(
            "SELECT {} FROM publications p WHERE p.id = ? AND p.agency_id = ?",
            PUBLICATION_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(agency_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(publication_from_row).transpose()
    }
}

#[async_trait]
impl PublicationStore for SqlitePublicationStore {
    async fn load(
        &self,
        id: Uuid,
        agency_id: &str,
    ) -> Result<Option<PublicationRecord>, StoreError> {
        let sql = format!(
            r#"
            SELECT {},
                c.channel_type, c.name AS channel_name, c.handle AS channel_handle,
                t.title, t.body, t.hashtags, t.media_url, t.job_id AS content_job_id
            FROM publications p
            JOIN channels c ON c.id = p.channel_id AND c.agency_id = p.agency_id
            JOIN contents t ON t.id = p.content_id AND t.agency_id = p.agency_id
            WHERE p.id = ? AND p.agency_id = ?
            "#,
            PUBLICATION_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(agency_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let publication = publication_from_row(&row)?;

        let channel_type: String = row.try_get("channel_type").map_err(db_err)?;
        let channel = Channel {
            id: publication.channel_id,
            agency_id: publication.agency_id.clone(),
            channel_type: channel_type
                .parse::<ChannelType>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            name: row.try_get("channel_name").map_err(db_err)?,
            handle: row.try_get("channel_handle").map_err(db_err)?,
        };

        let hashtags: String = row.try_get("hashtags").map_err(db_err)?;
        let content = Content {
            id: publication.content_id,
            agency_id: publication.agency_id.clone(),
            job_id: row.try_get("content_job_id").map_err(db_err)?,
            title: row.try_get("title").map_err(db_err)?,
            body: row.try_get("body").map_err(db_err)?,
            hashtags: serde_json::from_str(&hashtags)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            media_url: row.try_get("media_url").map_err(db_err)?,
        };

        Ok(Some(PublicationRecord {
            publication,
            channel,
            content,
        }))
    }

    async fn claim(
        &self,
        id: Uuid,
        agency_id: &str,
        max_attempts: u32,
        now: OffsetDateTime,
    ) -> Result<Option<Publication>, StoreError> {
        let now = format_time(now)?;

        let result = sqlx::query(
            r#"
            UPDATE publications
            SET status = 'PUBLISHING',
                attempt_count = attempt_count + 1,
                last_attempt_at = ?,
                updated_at = ?
            WHERE id = ? AND agency_id = ?
              AND status IN ('DRAFT', 'FAILED')
              AND attempt_count < ?
            "#,
        )
        .bind(&now)
        .bind(&now)
        .bind(id.to_string())
        .bind(agency_id)
        .bind(max_attempts as i64)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            tracing::debug!(publication_id = %id, "Claim not applied");
            return Ok(None);
        }

        self.fetch_publication(id, agency_id).await
    }

    async fn complete(
        &self,
        id: Uuid,
        agency_id: &str,
        update: TerminalUpdate,
    ) -> Result<Publication, StoreError> {
        let mut publication = self
            .fetch_publication(id, agency_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        publication
            .apply_terminal(&update)
            .map_err(|e| StoreError::InvalidState(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE publications
            SET status = ?,
                published_at = ?,
                external_id = ?,
                external_url = ?,
                error_message = ?,
                updated_at = ?
            WHERE id = ? AND agency_id = ? AND status = 'PUBLISHING'
            "#,
        )
        .bind(publication.status.as_str())
        .bind(format_opt_time(publication.published_at)?)
        .bind(&publication.external_id)
        .bind(&publication.external_url)
        .bind(&publication.error_message)
        .bind(format_time(publication.updated_at)?)
        .bind(id.to_string())
        .bind(agency_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidState(format!(
                "publication {} is no longer PUBLISHING",
                id
            )));
        }

        Ok(publication)
    }

    async fn list_retryable(
        &self,
        agency_id: &str,
        max_attempts: u32,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM publications
            WHERE agency_id = ? AND status IN ('DRAFT', 'FAILED') AND attempt_count < ?
            ORDER BY created_at ASC
            LIMIT ?
            "#,
        )
        .bind(agency_id)
        .bind(max_attempts as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(id,)| parse_uuid(&id))
            .collect()
    }
}

async fn insert_content(
    conn: &mut SqliteConnection,
    content: &Content,
) -> Result<(), StoreError> {
    let hashtags = serde_json::to_string(&content.hashtags)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO contents (id, agency_id, job_id, title, body, hashtags, media_url)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(content.id.to_string())
    .bind(&content.agency_id)
    .bind(&content.job_id)
    .bind(&content.title)
    .bind(&content.body)
    .bind(&hashtags)
    .bind(&content.media_url)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

async fn insert_publication(
    conn: &mut SqliteConnection,
    publication: &Publication,
) -> Result<(), StoreError> {
    let (owned,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM channels c, contents t
        WHERE c.id = ? AND c.agency_id = ? AND t.id = ? AND t.agency_id = ?
        "#,
    )
    .bind(publication.channel_id.to_string())
    .bind(&publication.agency_id)
    .bind(publication.content_id.to_string())
    .bind(&publication.agency_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;

    if owned == 0 {
        return Err(StoreError::NotFound(format!(
            "channel {} or content {} for agency {}",
            publication.channel_id, publication.content_id, publication.agency_id
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO publications
        (id, agency_id, job_id, channel_id, content_id, status, attempt_count,
         last_attempt_at, published_at, external_id, external_url, error_message,
         created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(publication.id.to_string())
    .bind(&publication.agency_id)
    .bind(&publication.job_id)
    .bind(publication.channel_id.to_string())
    .bind(publication.content_id.to_string())
    .bind(publication.status.as_str())
    .bind(publication.attempt_count as i64)
    .bind(format_opt_time(publication.last_attempt_at)?)
    .bind(format_opt_time(publication.published_at)?)
    .bind(&publication.external_id)
    .bind(&publication.external_url)
    .bind(&publication.error_message)
    .bind(format_time(publication.created_at)?)
    .bind(format_time(publication.updated_at)?)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

fn publication_from_row(row: &SqliteRow) -> Result<Publication, StoreError> {
    let status: String = row.try_get("status").map_err(db_err)?;
    let attempt_count: i64 = row.try_get("attempt_count").map_err(db_err)?;

    Ok(Publication {
        id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_err)?)?,
        agency_id: row.try_get("agency_id").map_err(db_err)?,
        job_id: row.try_get("job_id").map_err(db_err)?,
        channel_id: parse_uuid(&row.try_get::<String, _>("channel_id").map_err(db_err)?)?,
        content_id: parse_uuid(&row.try_get::<String, _>("content_id").map_err(db_err)?)?,
        status: status
            .parse()
            .map_err(|e: social_publish_domain::LifecycleError| {
                StoreError::Serialization(e.to_string())
            })?,
        attempt_count: u32::try_from(attempt_count)
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        last_attempt_at: parse_opt_time(row.try_get("last_attempt_at").map_err(db_err)?)?,
        published_at: parse_opt_time(row.try_get("published_at").map_err(db_err)?)?,
        external_id: row.try_get("external_id").map_err(db_err)?,
        external_url: row.try_get("external_url").map_err(db_err)?,
        error_message: row.try_get("error_message").map_err(db_err)?,
        created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(db_err)?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(db_err)?)?,
    })
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn format_time(value: OffsetDateTime) -> Result<String, StoreError> {
    value
        .format(&Rfc3339)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn format_opt_time(value: Option<OffsetDateTime>) -> Result<Option<String>, StoreError> {
    value.map(format_time).transpose()
}

fn parse_time(value: &str) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn parse_opt_time(value: Option<String>) -> Result<Option<OffsetDateTime>, StoreError> {
    value.as_deref().map(parse_time).transpose()
}
