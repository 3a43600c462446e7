//! In-memory document store.
//!
//! Documents live in a `Vec` behind a `RwLock`. Nothing is persisted; all
//! data is lost when the process exits. Used by tests and by `memory://`
//! store URIs during local development.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{DocumentStore, StorageError, StoredDocument};

/// An in-memory document store.
///
/// Clones share the same underlying data. The backend can be switched
/// offline to simulate an unreachable database.
///
/// # Examples
///
/// ```
/// # use guestbook_storage::{DocumentStore, MemoryBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryBackend::new();
/// store.insert("entries", serde_json::json!({"name": "Ada"})).await.unwrap();
/// let docs = store.find_recent("entries", None).await.unwrap();
/// assert_eq!(docs.len(), 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    documents: Arc<RwLock<Vec<StoredDocument>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (`true`) or succeed again (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of documents across all collections.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents at all.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connect {
                target: "memory".to_owned(),
                reason: "backend is offline".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryBackend {
    async fn insert(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<StoredDocument, StorageError> {
        self.check_online().map_err(|e| StorageError::Write {
            collection: collection.to_owned(),
            reason: e.to_string(),
        })?;

        let now = Utc::now();
        let doc = StoredDocument {
            id: Uuid::new_v4(),
            collection: collection.to_owned(),
            body,
            created_at: now,
            updated_at: now,
        };

        self.documents.write().await.push(doc.clone());
        Ok(doc)
    }

    async fn find_recent(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        self.check_online().map_err(|e| StorageError::Read {
            collection: collection.to_owned(),
            reason: e.to_string(),
        })?;

        let documents = self.documents.read().await;

        // Vector position is the insertion sequence.
        let mut matching: Vec<(usize, &StoredDocument)> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.collection == collection)
            .collect();
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        let take = limit.unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(take)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_online()
    }
}
