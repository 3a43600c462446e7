//! Connection lifecycle for the document store.
//!
//! [`StoreClient`] wraps whatever backend a [`Connector`] produces and owns
//! three behaviours:
//!
//! 1. **Initial connect**: attempts are paced by the injected
//!    [`RetryPolicy`]; exhausting it is fatal for the caller.
//! 2. **Not-ready state**: while disconnected every call fails fast with
//!    [`StorageError::NotConnected`]. Nothing is queued.
//! 3. **Reconnect**: [`StoreClient::supervise`] pings the live backend on an
//!    interval and, after a failed ping, reconnects with the policy's delay
//!    until it succeeds or shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[cfg(feature = "postgres-backend")]
use crate::postgres_backend::{PostgresBackend, PostgresOptions};
use crate::{DocumentStore, MemoryBackend, RetryPolicy, StorageError, StoredDocument};

/// Produces live backend connections.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connect`] (or a backend-specific error) when
    /// the store cannot be reached.
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>, StorageError>;

    /// A human-readable, credential-free description of the target.
    fn describe(&self) -> String;
}

#[async_trait::async_trait]
impl Connector for MemoryBackend {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>, StorageError> {
        Ok(Arc::new(self.clone()))
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}

/// Connects to a store selected by URI scheme.
///
/// - `memory://`: an in-memory store that survives reconnects
/// - `postgres://` / `postgresql://`: [`PostgresBackend`] (feature `postgres-backend`)
pub struct UriConnector {
    uri: String,
    memory: MemoryBackend,
    #[cfg(feature = "postgres-backend")]
    options: PostgresOptions,
}

impl std::fmt::Debug for UriConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriConnector")
            .field("uri", &redact_uri(&self.uri))
            .finish_non_exhaustive()
    }
}

impl UriConnector {
    /// Create a connector for `uri`.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            memory: MemoryBackend::new(),
            #[cfg(feature = "postgres-backend")]
            options: PostgresOptions::default(),
        }
    }

    /// Override PostgreSQL pool options.
    #[cfg(feature = "postgres-backend")]
    #[must_use]
    pub fn with_postgres_options(mut self, options: PostgresOptions) -> Self {
        self.options = options;
        self
    }

    fn scheme(&self) -> &str {
        self.uri.split_once("://").map_or("", |(scheme, _)| scheme)
    }
}

#[async_trait::async_trait]
impl Connector for UriConnector {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>, StorageError> {
        match self.scheme() {
            "memory" => Ok(Arc::new(self.memory.clone())),
            #[cfg(feature = "postgres-backend")]
            "postgres" | "postgresql" => {
                let backend =
                    PostgresBackend::connect(&self.uri, &self.describe(), self.options).await?;
                Ok(Arc::new(backend))
            }
            other => Err(StorageError::UnsupportedUri {
                scheme: other.to_owned(),
            }),
        }
    }

    fn describe(&self) -> String {
        redact_uri(&self.uri)
    }
}

/// Strip credentials and query parameters from a connection URI.
#[must_use]
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return "[unparseable uri]".to_owned();
    };
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
    format!("{scheme}://{rest}")
}

/// Run connect attempts until one succeeds or the policy gives up.
///
/// An attempt counts as successful only once the fresh backend answers a
/// ping.
async fn connect_with_retry(
    connector: &dyn Connector,
    policy: RetryPolicy,
) -> Result<Arc<dyn DocumentStore>, StorageError> {
    let target = connector.describe();
    let mut attempt: u32 = 1;

    loop {
        let result = match connector.connect().await {
            Ok(store) => store.ping().await.map(|()| store),
            Err(e) => Err(e),
        };

        match result {
            Ok(store) => {
                info!(target = %target, attempt, "document store connected");
                return Ok(store);
            }
            Err(e) if !policy.allows(attempt.saturating_add(1)) => {
                error!(target = %target, attempt, error = %e, "document store connection failed, giving up");
                return Err(StorageError::RetriesExhausted {
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    target = %target,
                    attempt,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "document store connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// A document store handle with managed connection lifecycle.
pub struct StoreClient {
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
    live: RwLock<Option<Arc<dyn DocumentStore>>>,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("target", &self.connector.describe())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Connect using `policy` for the initial attempts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::RetriesExhausted`] when every permitted
    /// attempt failed.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        policy: RetryPolicy,
    ) -> Result<Self, StorageError> {
        let store = connect_with_retry(connector.as_ref(), policy).await?;

        Ok(Self {
            connector,
            policy,
            live: RwLock::new(Some(store)),
        })
    }

    /// Whether a live connection is currently held.
    pub async fn is_connected(&self) -> bool {
        self.live.read().await.is_some()
    }

    async fn current(&self) -> Result<Arc<dyn DocumentStore>, StorageError> {
        self.live
            .read()
            .await
            .clone()
            .ok_or(StorageError::NotConnected)
    }

    /// Health-check the connection until `shutdown` flips.
    ///
    /// A failed ping drops the live connection, so in-flight callers see
    /// [`StorageError::NotConnected`], then reconnects after the policy
    /// delay. Reconnection is unbounded regardless of the initial attempt cap.
    pub async fn supervise(&self, health_interval: Duration, shutdown: &mut watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(health_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the connection was just verified.
        interval.tick().await;

        info!(interval_secs = health_interval.as_secs(), "store supervisor started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let current = self.live.read().await.clone();
                    let healthy = match current {
                        Some(store) => match store.ping().await {
                            Ok(()) => true,
                            Err(e) => {
                                warn!(error = %e, "document store disconnected, attempting to reconnect");
                                false
                            }
                        },
                        None => false,
                    };

                    if healthy {
                        debug!("document store healthy");
                        continue;
                    }

                    *self.live.write().await = None;

                    match self.reconnect(shutdown).await {
                        Some(store) => *self.live.write().await = Some(store),
                        None => {
                            info!("store supervisor shutting down");
                            return;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    info!("store supervisor shutting down");
                    return;
                }
            }
        }
    }

    /// Wait the policy delay, then retry until connected. Returns `None` on
    /// shutdown.
    async fn reconnect(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Arc<dyn DocumentStore>> {
        tokio::select! {
            () = tokio::time::sleep(self.policy.delay) => {}
            _ = shutdown.changed() => return None,
        }

        let policy = self.policy.unbounded();
        tokio::select! {
            result = connect_with_retry(self.connector.as_ref(), policy) => match result {
                Ok(store) => Some(store),
                Err(e) => {
                    error!(error = %e, "document store reconnect loop ended unexpectedly");
                    None
                }
            },
            _ = shutdown.changed() => None,
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for StoreClient {
    async fn insert(
        &self,
        collection: &str,
        body: serde_json::Value,
    ) -> Result<StoredDocument, StorageError> {
        self.current().await?.insert(collection, body).await
    }

    async fn find_recent(
        &self,
        collection: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        self.current().await?.find_recent(collection, limit).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.current().await?.ping().await
    }
}
