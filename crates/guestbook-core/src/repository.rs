//! Entry repository.
//!
//! The only write path in the system: entries are validated, then stored as
//! documents in the `entries` collection. Entries are never updated or
//! deleted. Listing is newest-first by the store-assigned `created_at`.

use std::sync::Arc;

use tracing::info;

use guestbook_storage::DocumentStore;

use crate::entry::{Entry, EntryLimits, NewEntry};
use crate::error::RepositoryError;

/// Collection holding guestbook entries.
pub const ENTRIES_COLLECTION: &str = "entries";

/// Default maximum number of entries returned by a listing.
pub const DEFAULT_LIST_CAP: usize = 100;

/// Create and list guestbook entries.
pub struct EntryRepository {
    store: Arc<dyn DocumentStore>,
    limits: EntryLimits,
    list_cap: Option<usize>,
}

impl std::fmt::Debug for EntryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryRepository")
            .field("limits", &self.limits)
            .field("list_cap", &self.list_cap)
            .finish_non_exhaustive()
    }
}

impl EntryRepository {
    /// Create a repository. `list_cap` of `None` allows unbounded listings.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, limits: EntryLimits, list_cap: Option<usize>) -> Self {
        Self {
            store,
            limits,
            list_cap,
        }
    }

    /// The field limits entries are validated against.
    #[must_use]
    pub const fn limits(&self) -> &EntryLimits {
        &self.limits
    }

    /// Validate and persist a new entry.
    ///
    /// Nothing reaches the store when validation fails.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::Validation`] if a field is missing, blank, or too long.
    /// - [`RepositoryError::Storage`] if the write fails.
    pub async fn create(&self, entry: NewEntry) -> Result<Entry, RepositoryError> {
        let body = entry.validate(&self.limits)?;
        let body = serde_json::to_value(&body).map_err(|e| {
            RepositoryError::Storage(guestbook_storage::StorageError::Serialization {
                reason: e.to_string(),
            })
        })?;

        let doc = self.store.insert(ENTRIES_COLLECTION, body).await?;
        let entry = Entry::try_from(doc)?;

        info!(entry_id = %entry.id, "entry created");

        Ok(entry)
    }

    /// List entries newest first.
    ///
    /// The effective limit is the smaller of `limit` and the configured cap.
    /// The result is fully materialized before returning.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::Storage`] if the read fails.
    /// - [`RepositoryError::Corrupt`] if a stored document is not an entry.
    pub async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<Entry>, RepositoryError> {
        let effective = match (limit, self.list_cap) {
            (Some(requested), Some(cap)) => Some(requested.min(cap)),
            (requested, cap) => requested.or(cap),
        };

        self.store
            .find_recent(ENTRIES_COLLECTION, effective)
            .await?
            .into_iter()
            .map(Entry::try_from)
            .collect()
    }
}
