//! Password verification: `POST /api/verify-password`.
//!
//! Lets the client check a password before showing the write form or the
//! entry list. Answers `isCorrect: false` for a mismatch rather than 401, so
//! the client can tell a wrong password from a broken request.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router, middleware};
use tracing::debug;

use guestbook_core::api::{VerifyPasswordRequest, VerifyPasswordResponse, present};
use guestbook_core::gate::AccessKind;

use crate::error::AppError;
use crate::middleware::rate_limit;
use crate::state::AppState;

/// Build the verify-password router, rate limited per client.
pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/verify-password", post(verify_password))
        .route_layer(middleware::from_fn_with_state(Arc::clone(state), rate_limit))
}

async fn verify_password(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyPasswordRequest>, JsonRejection>,
) -> Result<Json<VerifyPasswordResponse>, AppError> {
    let Json(req) = payload?;

    let (Some(password), Some(kind)) = (
        present(req.password.as_deref()),
        present(req.kind.as_deref()),
    ) else {
        return Err(AppError::BadRequest("Missing required fields".to_owned()));
    };

    let kind: AccessKind = kind.parse()?;
    let is_correct = state.gate.verify(password, kind)?;
    debug!(kind = %kind, is_correct, "password checked");

    Ok(Json(VerifyPasswordResponse {
        success: true,
        is_correct,
    }))
}
