//! Storage error types.
//!
//! Every variant carries enough context to diagnose the problem without a
//! debugger. Connection strings never appear in error text; callers pass a
//! redacted description instead.

/// Errors that can occur while talking to the document store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A single connection attempt failed.
    #[error("failed to connect to '{target}': {reason}")]
    Connect { target: String, reason: String },

    /// The store is currently disconnected; the call was not attempted.
    #[error("document store is not connected")]
    NotConnected,

    /// The connect loop gave up after the retry policy was exhausted.
    #[error("gave up connecting after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The connection URI uses a scheme no backend understands.
    #[error("unsupported store URI scheme '{scheme}'")]
    UnsupportedUri { scheme: String },

    /// Schema setup failed after connecting.
    #[error("schema migration failed: {reason}")]
    Migration { reason: String },

    /// Failed to read documents from a collection.
    #[error("failed to read collection '{collection}': {reason}")]
    Read { collection: String, reason: String },

    /// Failed to write a document to a collection.
    #[error("failed to write to collection '{collection}': {reason}")]
    Write { collection: String, reason: String },

    /// A document body could not be encoded or decoded.
    #[error("document serialization failed: {reason}")]
    Serialization { reason: String },
}

impl StorageError {
    /// Whether the error indicates the connection itself is unusable, as
    /// opposed to a rejected individual operation.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::NotConnected | Self::RetriesExhausted { .. }
        )
    }
}
