//! Entry routes: `POST /api/entries` and `GET /api/entries`.
//!
//! The access gate runs before the repository is touched, so a wrong
//! password never reads or writes anything.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use guestbook_core::api::{CreateEntryRequest, ListEntriesQuery, SuccessResponse, present};
use guestbook_core::entry::Entry;
use guestbook_core::gate::AccessKind;

use crate::error::AppError;
use crate::state::AppState;

/// Build the entries router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/entries", get(list_entries).post(create_entry))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateEntryRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(req) = payload?;

    let (Some(password), Some(entry)) = (present(req.password.as_deref()), req.entry) else {
        return Err(AppError::BadRequest("Missing required fields".to_owned()));
    };

    state.gate.require(password, AccessKind::Write)?;
    state.repository.create(entry).await?;

    Ok(Json(SuccessResponse::ok()))
}

async fn list_entries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListEntriesQuery>, QueryRejection>,
) -> Result<Json<Vec<Entry>>, AppError> {
    let Query(query) = query?;

    let Some(password) = present(query.password.as_deref()) else {
        return Err(AppError::BadRequest("Password is required".to_owned()));
    };

    state.gate.require(password, AccessKind::Read)?;
    let entries = state.repository.list_recent(query.limit).await?;

    Ok(Json(entries))
}
