//! Route definitions for glideins, mounted at `/glideins`.
//!
//! ```text
//! GET    /                 list_glideins
//! POST   /                 create_glidein
//! GET    /{id}             get_glidein
//! GET    /{id}/history     get_glidein_history
//! POST   /{id}/submit      submit_glidein
//! POST   /{id}/remove      remove_glidein
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::glideins;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(glideins::list_glideins).post(glideins::create_glidein))
        .route("/{id}", get(glideins::get_glidein))
        .route("/{id}/history", get(glideins::get_glidein_history))
        .route("/{id}/submit", post(glideins::submit_glidein))
        .route("/{id}/remove", post(glideins::remove_glidein))
}
