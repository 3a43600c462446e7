//! JSON wire types for the guestbook HTTP API.
//!
//! Shared by the server handlers and the client controller so both sides
//! agree on field names. Request fields are optional so that a missing
//! field is answered with a 400 and a readable message instead of a decode
//! failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::NewEntry;

/// Body of `POST /api/verify-password`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPasswordRequest {
    pub password: Option<String>,
    /// `"write"` or `"read"`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Response of `POST /api/verify-password`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordResponse {
    pub success: bool,
    pub is_correct: bool,
}

/// Body of `POST /api/entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub password: Option<String>,
    pub entry: Option<NewEntry>,
}

/// Generic `{ "success": true }` acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

/// Query string of `GET /api/entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntriesQuery {
    pub password: Option<String>,
    pub limit: Option<usize>,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// `"connected"` or `"disconnected"`.
    pub database: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error kind, e.g. `unauthorized`.
    pub error: String,
    /// Human-readable message safe to show to users.
    pub message: String,
}

/// Treat an empty string the same as an absent field.
#[must_use]
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
