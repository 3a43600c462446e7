//! Static client assets.
//!
//! Files under the configured directory are served as-is. Any other GET
//! falls back to `index.html` so the single-page client handles routing.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

/// Build the UI router rooted at `static_dir`.
pub fn router(static_dir: &Path) -> Router<Arc<AppState>> {
    let index = ServeFile::new(static_dir.join("index.html"));
    Router::new().fallback_service(ServeDir::new(static_dir).fallback(index))
}
