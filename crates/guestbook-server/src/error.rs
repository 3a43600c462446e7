//! HTTP error types for the guestbook server.
//!
//! Maps domain errors from `guestbook-core` into HTTP responses. Every
//! variant produces a JSON body `{ success: false, error, message }`. Internal
//! and configuration failures are logged here and answered with a generic
//! message so no storage or configuration detail reaches the client.

use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use guestbook_core::api::ErrorResponse;
use guestbook_core::error::{GateError, RepositoryError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent missing or malformed input.
    BadRequest(String),
    /// Password mismatch.
    Unauthorized(String),
    /// A required secret is not configured on the server.
    Misconfigured,
    /// Request body exceeded the configured limit.
    PayloadTooLarge,
    /// Client exceeded the rate limit.
    TooManyRequests { retry_after: Duration },
    /// Storage or other unexpected failure. The detail is logged only.
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, error_type, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::Misconfigured => {
                error!("request rejected: access secret not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_misconfiguration",
                    "Server configuration error".to_owned(),
                )
            }
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Request body too large".to_owned(),
            ),
            Self::TooManyRequests { retry_after: wait } => {
                retry_after = Some((wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "too_many_requests",
                    "Too many requests, please try again later".to_owned(),
                )
            }
            Self::Internal(detail) => {
                error!(error = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_owned(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: error_type.to_owned(),
            message,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::UnknownKind { .. } => Self::BadRequest("Invalid password type".to_owned()),
            GateError::NotConfigured { .. } => Self::Misconfigured,
            GateError::Denied => Self::Unauthorized("Incorrect password".to_owned()),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(ref reason) => {
                debug!(reason = %reason, "entry rejected");
                Self::BadRequest("Invalid entry data".to_owned())
            }
            RepositoryError::Storage(_) | RepositoryError::Corrupt { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::PayloadTooLarge;
        }
        debug!(reason = %rejection.body_text(), "malformed JSON body");
        Self::BadRequest("Invalid JSON body".to_owned())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(reason = %rejection.body_text(), "malformed query string");
        Self::BadRequest("Invalid query parameters".to_owned())
    }
}
