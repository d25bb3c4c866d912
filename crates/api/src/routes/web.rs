//! Static project pages.
//!
//! ```text
//! GET    /                 redirect to /web/index.html
//! GET    /web/*            files under the configured web directory
//! ```

use std::path::Path;

use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;

use crate::state::AppState;

pub const INDEX_PATH: &str = "/web/index.html";

pub fn router(web_dir: &Path) -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to(INDEX_PATH) }))
        .nest_service("/web", ServeDir::new(web_dir))
}
