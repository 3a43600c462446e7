//! PostgreSQL document store.
//!
//! Stores every document in a single `documents` table with the body in a
//! `JSONB` column. A `BIGSERIAL` sequence column gives a strict insertion
//! order that breaks ties between equal `created_at` values.
//!
//! Feature-gated behind `postgres-backend`. Uses `sqlx` with the Tokio
//! runtime for fully async operations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{DocumentStore, StorageError, StoredDocument};

/// Connection options for [`PostgresBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostgresOptions {
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// How long to wait for a connection before failing.
    pub connect_timeout: Duration,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// A document store backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    collection: String,
    body: sqlx::types::Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            collection: row.collection,
            body: row.body.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresBackend {
    /// Connect to PostgreSQL and run the schema migration.
    ///
    /// `target` is a redacted description of the database used in error
    /// messages; the URL itself is never echoed.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Connect`] if the pool cannot be established.
    /// - [`StorageError::Migration`] if table or index creation fails.
    pub async fn connect(
        database_url: &str,
        target: &str,
        options: PostgresOptions,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connect {
                target: target.to_owned(),
                reason: e.to_string(),
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (\
                seq        BIGSERIAL   PRIMARY KEY, \
                id         UUID        NOT NULL UNIQUE, \
                collection TEXT        NOT NULL, \
                body       JSONB       NOT NULL, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(), \
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()\
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| StorageError::Migration {
            reason: format!("create table: {e}"),
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_recent \
             ON documents (collection, created_at DESC, seq DESC)",
        )
        .execute(&pool)
        .await
        .map_err(|e| StorageError::Migration {
            reason: format!("create index: {e}"),
        })?;

        Ok(Self { pool })
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresBackend {
    async fn insert(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<StoredDocument, StorageError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r"INSERT INTO documents (id, collection, body)
              VALUES ($1, $2, $3)
              RETURNING id, collection, body, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(collection)
        .bind(sqlx::types::Json(body))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Write {
            collection: collection.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(row.into())
    }

    async fn find_recent(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        // LIMIT NULL means no limit in PostgreSQL.
        let limit = limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));

        let rows = sqlx::query_as::<_, DocumentRow>(
            r"SELECT id, collection, body, created_at, updated_at
              FROM documents
              WHERE collection = $1
              ORDER BY created_at DESC, seq DESC
              LIMIT $2",
        )
        .bind(collection)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Read {
            collection: collection.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connect {
                target: "postgres".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
