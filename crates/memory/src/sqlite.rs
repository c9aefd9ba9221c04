//! SQLite record store.
//!
//! One table per tier collection (`short_term_memory`, `long_term_memory`,
//! `context_memory`), all sharing the schema:
//! - `id`, `content`, `category`, `tier` as TEXT
//! - `importance` as REAL
//! - `created_at` / `updated_at` as fixed-width RFC 3339 TEXT (sorts lexically)
//! - `embedding` as a little-endian f32 BLOB
//!
//! Collection names are checked against the known tiers before being
//! interpolated into SQL; every value goes through a bind parameter.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mastermind_core::error::StoreError;
use mastermind_core::knowledge::{KnowledgeItem, RecordFilter, RecordStore, RecordUpdate, Tier};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::ensure_collection;

/// A SQLite-backed [`RecordStore`].
///
/// Cloning shares the underlying pool.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (or create) a database file and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database lives per connection, so keep exactly one.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite knowledge store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create one table and its ranking index per tier.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        for tier in Tier::ALL {
            let table = tier.collection();
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id          TEXT PRIMARY KEY NOT NULL,
                    content     TEXT NOT NULL,
                    category    TEXT NOT NULL,
                    importance  REAL NOT NULL,
                    tier        TEXT NOT NULL,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL,
                    embedding   BLOB NOT NULL
                )
                "#
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("{table} table: {e}")))?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_rank ON {table}(importance DESC, created_at DESC)"
            ))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("{table} index: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeItem, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let content: String = row.try_get("content").map_err(|e| column("content", e))?;
        let category: String = row.try_get("category").map_err(|e| column("category", e))?;
        let importance: f64 = row.try_get("importance").map_err(|e| column("importance", e))?;
        let tier: String = row.try_get("tier").map_err(|e| column("tier", e))?;
        let created_at: String = row.try_get("created_at").map_err(|e| column("created_at", e))?;
        let updated_at: String = row.try_get("updated_at").map_err(|e| column("updated_at", e))?;
        let blob: Vec<u8> = row.try_get("embedding").map_err(|e| column("embedding", e))?;

        let tier = Tier::from_str(&tier)
            .map_err(|e| StoreError::QueryFailed(format!("tier column: {e}")))?;

        Ok(KnowledgeItem {
            id,
            content,
            embedding: blob_to_embedding(&blob),
            category,
            importance: importance as f32,
            tier,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            relevance: 0.0,
        })
    }
}

/// Serialize an embedding vector to bytes.
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("bad timestamp '{raw}': {e}")))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, collection: &str, item: KnowledgeItem) -> Result<String, StoreError> {
        ensure_collection(collection)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {collection}
                (id, content, category, importance, tier, created_at, updated_at, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#
        ))
        .bind(&item.id)
        .bind(&item.content)
        .bind(&item.category)
        .bind(item.importance as f64)
        .bind(item.tier.as_str())
        .bind(format_timestamp(&item.created_at))
        .bind(format_timestamp(&item.updated_at))
        .bind(embedding_to_blob(&item.embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT into {collection} failed: {e}")))?;

        debug!(collection, id = %item.id, "Stored knowledge item");
        Ok(item.id)
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Option<KnowledgeItem>, StoreError> {
        ensure_collection(collection)?;

        let row = sqlx::query(&format!("SELECT * FROM {collection} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET by ID: {e}")))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: RecordUpdate,
    ) -> Result<bool, StoreError> {
        ensure_collection(collection)?;

        let mut sets: Vec<&str> = Vec::new();
        if update.importance.is_some() {
            sets.push("importance = ?");
        }
        if update.category.is_some() {
            sets.push("category = ?");
        }
        if update.updated_at.is_some() {
            sets.push("updated_at = ?");
        }

        if sets.is_empty() {
            return Ok(self.read(collection, id).await?.is_some());
        }

        let sql = format!("UPDATE {collection} SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(importance) = update.importance {
            query = query.bind(importance as f64);
        }
        if let Some(ref category) = update.category {
            query = query.bind(category.clone());
        }
        if let Some(updated_at) = update.updated_at {
            query = query.bind(format_timestamp(&updated_at));
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        ensure_collection(collection)?;

        let result = sqlx::query(&format!("DELETE FROM {collection} WHERE id = ?1"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<KnowledgeItem>, StoreError> {
        ensure_collection(collection)?;

        let mut conditions: Vec<&str> = Vec::new();
        if filter.min_importance.is_some() {
            conditions.push("importance >= ?");
        }
        if filter.below_importance.is_some() {
            conditions.push("importance < ?");
        }
        if filter.category.is_some() {
            conditions.push("category = ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT * FROM {collection} {where_clause} \
             ORDER BY importance DESC, created_at DESC, id ASC LIMIT ?"
        );

        let mut query = sqlx::query(&sql);
        if let Some(min) = filter.min_importance {
            query = query.bind(min as f64);
        }
        if let Some(max) = filter.below_importance {
            query = query.bind(max as f64);
        }
        if let Some(ref category) = filter.category {
            query = query.bind(category.clone());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = query
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{collection} query: {e}")))?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        ensure_collection(collection)?;

        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {collection}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
