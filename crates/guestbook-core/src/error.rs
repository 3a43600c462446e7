//! Error types for `guestbook-core`.
//!
//! Errors never carry submitted passwords or entry contents. Field names
//! and lengths are enough to explain a rejection.

use guestbook_storage::StorageError;

use crate::gate::AccessKind;

/// Why an entry failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("missing required field '{field}'")]
    Missing { field: &'static str },

    /// A field was present but blank.
    #[error("field '{field}' must not be empty")]
    Empty { field: &'static str },

    /// A field exceeded its configured byte length.
    #[error("field '{field}' is {actual} bytes, limit is {max}")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    /// The signature is not an image data URI.
    #[error("signature must be an image data URI")]
    InvalidSignature,
}

/// Errors from the access gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The requested access type is neither `write` nor `read`.
    #[error("unknown access type '{kind}'")]
    UnknownKind { kind: String },

    /// The server holds no secret for the requested kind. The message is the
    /// same for both kinds.
    #[error("access secret is not configured")]
    NotConfigured { kind: AccessKind },

    /// The submitted password did not match.
    #[error("incorrect password")]
    Denied,
}

/// Errors from the entry repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The entry was rejected before reaching storage.
    #[error("invalid entry: {0}")]
    Validation(#[from] ValidationError),

    /// The document store failed or is unreachable.
    #[error("entry storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored document could not be decoded as an entry.
    #[error("stored entry {id} is corrupt: {reason}")]
    Corrupt { id: uuid::Uuid, reason: String },
}
