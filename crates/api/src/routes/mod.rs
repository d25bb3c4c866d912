pub mod glideins;
pub mod health;
pub mod sites;
pub mod web;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /sites                       list, create
/// /sites/{id}                  get
/// /sites/{id}/submit           submit
/// /sites/{id}/remove           remove
///
/// /glideins                    list, create
/// /glideins/{id}               get
/// /glideins/{id}/submit        submit
/// /glideins/{id}/remove        remove
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sites", sites::router())
        .nest("/glideins", glideins::router())
}
