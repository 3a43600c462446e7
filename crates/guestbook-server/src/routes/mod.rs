//! HTTP route handlers for the guestbook.
//!
//! Routes are organized by concern:
//! - `auth`: password verification (rate limited)
//! - `entries`: create and list entries
//! - `sys`: health check
//! - `ui`: static client assets and the single-page catch-all

pub mod auth;
pub mod entries;
pub mod sys;
pub mod ui;
