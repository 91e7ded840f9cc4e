//! SQLite-backed record store.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::models::{ChatRecord, NewRecord};
use super::store::RecordStore;

/// Schema for the message log.
///
/// AUTOINCREMENT keeps ids above the high-water mark even after a bulk
/// clear; SQLite never hands a cleared id out again.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    incoming TEXT NOT NULL,
    reply TEXT NOT NULL,
    model TEXT,
    raw_response TEXT,
    user_agent TEXT,
    ip TEXT,
    page TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_ts ON messages(ts);
"#;

/// Structured message store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteRecordStore {
    /// Open or create the message database.
    ///
    /// Creates the database file and parent directories if they don't exist.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory: {}", parent.display()))?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .context("parsing database URL")?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(3)
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to message database: {}", path.display()))?;

        let store = Self {
            pool,
            path: path.to_path_buf(),
        };
        store.initialize_schema().await?;

        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("parsing in-memory database URL")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("connecting to in-memory database")?;

        let store = Self {
            pool,
            path: PathBuf::from(":memory:"),
        };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("initializing message schema")?;
        Ok(())
    }

    /// Get the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the database is healthy.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn append(&self, new: NewRecord) -> Result<ChatRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (ts, incoming, reply, model, raw_response, user_agent, ip, page)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&new.ts)
        .bind(&new.incoming)
        .bind(&new.reply)
        .bind(&new.model)
        .bind(&new.raw_response)
        .bind(&new.user_agent)
        .bind(&new.ip)
        .bind(&new.page)
        .fetch_one(&self.pool)
        .await
        .context("inserting message")?;

        Ok(new.into_record(id))
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatRecord>> {
        sqlx::query_as::<_, ChatRecord>(
            r#"
            SELECT id, ts, incoming, reply, model, raw_response, user_agent, ip, page
            FROM messages
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching recent messages")
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages")
            .execute(&self.pool)
            .await
            .context("clearing messages")?;

        Ok(result.rows_affected())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
