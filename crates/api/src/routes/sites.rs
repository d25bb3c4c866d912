//! Route definitions for sites, mounted at `/sites`.
//!
//! ```text
//! GET    /                 list_sites
//! POST   /                 create_site
//! GET    /{id}             get_site
//! GET    /{id}/history     get_site_history
//! POST   /{id}/submit      submit_site
//! POST   /{id}/remove      remove_site
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sites;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sites::list_sites).post(sites::create_site))
        .route("/{id}", get(sites::get_site))
        .route("/{id}/history", get(sites::get_site_history))
        .route("/{id}/submit", post(sites::submit_site))
        .route("/{id}/remove", post(sites::remove_site))
}
