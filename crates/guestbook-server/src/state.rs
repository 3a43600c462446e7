//! Shared application state for the guestbook server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. Everything in it is either immutable or
//! internally synchronized.

use std::sync::Arc;

use guestbook_core::gate::AccessGate;
use guestbook_core::repository::EntryRepository;
use guestbook_storage::{DocumentStore, StoreClient};

use crate::config::ServerConfig;
use crate::middleware::FixedWindowLimiter;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Startup configuration.
    pub config: Arc<ServerConfig>,
    /// Write and read secret comparison.
    pub gate: AccessGate,
    /// Entry persistence.
    pub repository: EntryRepository,
    /// Managed store connection, also used for health reporting.
    pub store: Arc<StoreClient>,
    /// Verify-password rate limiter.
    pub limiter: FixedWindowLimiter,
}

impl AppState {
    /// Wire the gate, repository, and limiter from `config` over `store`.
    #[must_use]
    pub fn new(config: Arc<ServerConfig>, store: Arc<StoreClient>) -> Self {
        let gate = AccessGate::new(
            Some(config.write_password.clone()),
            Some(config.read_password.clone()),
        );
        let documents: Arc<dyn DocumentStore> = store.clone();
        let repository = EntryRepository::new(documents, config.entry_limits, config.list_limit);
        let limiter = FixedWindowLimiter::new(config.rate_limit_window, config.rate_limit_max);

        Self {
            config,
            gate,
            repository,
            store,
            limiter,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
