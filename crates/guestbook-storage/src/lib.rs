//! Document store abstraction for the guestbook.
//!
//! This crate defines the [`DocumentStore`] trait, a collection-oriented
//! document interface that knows nothing about guestbook entries. Bodies are
//! opaque JSON values; the store only assigns identity and timestamps.
//!
//! Two implementations are provided:
//!
//! - [`PostgresBackend`]: production default, JSONB documents in PostgreSQL (feature `postgres-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and `memory://` development URIs
//!
//! On top of a backend sits [`StoreClient`], which owns the connection
//! lifecycle: the initial connect loop driven by a [`RetryPolicy`], the
//! not-ready state while disconnected, and background reconnection.

mod client;
mod error;
mod memory;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;
mod retry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use client::{Connector, StoreClient, UriConnector, redact_uri};
pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::{PostgresBackend, PostgresOptions};
pub use retry::{Backoff, RetryPolicy};

/// A document as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// Collection the document belongs to.
    pub collection: String,
    /// The caller's body, stored and returned unmodified.
    pub body: serde_json::Value,
    /// When the store accepted the document.
    pub created_at: DateTime<Utc>,
    /// Last modification time. Equal to `created_at` for immutable records.
    pub updated_at: DateTime<Utc>,
}

/// A pluggable document store.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
/// There are no update or delete operations: documents are immutable once
/// inserted.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a new document into `collection`.
    ///
    /// The store assigns a fresh id and sets both timestamps to the current
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn insert(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<StoredDocument, StorageError>;

    /// Fetch documents of `collection`, newest first.
    ///
    /// Ordering is by `created_at` descending with insertion order as the
    /// tiebreaker, so two documents never compare equal. `limit` of `None`
    /// returns every document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn find_recent(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, StorageError>;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot serve requests.
    async fn ping(&self) -> Result<(), StorageError>;
}
