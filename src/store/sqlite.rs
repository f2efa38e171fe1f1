//! SQLite store for interaction records.
//!
//! Backs the interaction log with a local SQLite database via sqlx. Creates the
//! database file and schema on first connect.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{Result, VolleyError};
use crate::request::RequestId;

use super::{InteractionRecord, InteractionStore, RecordQuery};

/// SQLite implementation of `InteractionStore`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `database_url` and ensure the
    /// schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!(database_url, "Opening interaction log");

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // One connection: SQLite has a single writer, and pooled connections
        // to an in-memory database would each see a distinct database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                request_id TEXT PRIMARY KEY,
                user_ref TEXT NOT NULL,
                kind TEXT NOT NULL,
                prompt TEXT NOT NULL,
                theme_tag TEXT NOT NULL,
                outcome TEXT NOT NULL,
                latency_ms INTEGER NOT NULL,
                payload_ref TEXT,
                error TEXT,
                attempts INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_interactions_kind ON interactions(kind)",
            "CREATE INDEX IF NOT EXISTS idx_interactions_outcome ON interactions(outcome)",
            "CREATE INDEX IF NOT EXISTS idx_interactions_created_at ON interactions(created_at)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }
}

/// Raw row shape; converted into `InteractionRecord` after fetch.
#[derive(sqlx::FromRow)]
struct InteractionRow {
    request_id: String,
    user_ref: String,
    kind: String,
    prompt: String,
    theme_tag: String,
    outcome: String,
    latency_ms: i64,
    payload_ref: Option<String>,
    error: Option<String>,
    attempts: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<InteractionRow> for InteractionRecord {
    type Error = VolleyError;

    fn try_from(row: InteractionRow) -> Result<Self> {
        let uuid = Uuid::parse_str(&row.request_id)
            .map_err(|e| VolleyError::Internal(format!("malformed request_id in store: {e}")))?;

        Ok(InteractionRecord {
            request_id: RequestId::from(uuid),
            user_ref: row.user_ref,
            kind: row.kind.parse()?,
            prompt: row.prompt,
            theme_tag: row.theme_tag,
            outcome: row.outcome.parse()?,
            latency_ms: row.latency_ms.max(0) as u64,
            payload_ref: row.payload_ref,
            error: row.error,
            attempts: row.attempts.max(0) as u32,
            created_at: row.created_at,
        })
    }
}

impl InteractionStore for SqliteStore {
    async fn insert(&self, record: &InteractionRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO interactions
                (request_id, user_ref, kind, prompt, theme_tag, outcome,
                 latency_ms, payload_ref, error, attempts, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.request_id.as_uuid().to_string())
        .bind(&record.user_ref)
        .bind(record.kind.as_str())
        .bind(&record.prompt)
        .bind(&record.theme_tag)
        .bind(record.outcome.as_str())
        .bind(record.latency_ms as i64)
        .bind(&record.payload_ref)
        .bind(&record.error)
        .bind(record.attempts as i64)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(VolleyError::Duplicate(record.request_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<InteractionRecord>> {
        let mut sql = String::from("SELECT * FROM interactions WHERE 1=1");

        if query.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        if query.since.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if query.until.is_some() {
            sql.push_str(" AND created_at < ?");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut q = sqlx::query_as::<_, InteractionRow>(&sql);
        if let Some(kind) = query.kind {
            q = q.bind(kind.as_str());
        }
        if let Some(since) = query.since {
            q = q.bind(since);
        }
        if let Some(until) = query.until {
            q = q.bind(until);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(InteractionRecord::try_from).collect()
    }
}
