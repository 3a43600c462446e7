//! Health check: `GET /api/health`.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use guestbook_core::api::HealthResponse;

use crate::state::AppState;

/// Build the system router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// Always 200 while the process is serving; `database` reports whether the
/// store supervisor currently holds a live connection.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = if state.store.is_connected().await {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status: "ok".to_owned(),
        timestamp: Utc::now(),
        database: database.to_owned(),
    })
}
