//! Handlers for sites.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use corral_core::credential::Credential;
use corral_core::error::CoreError;
use corral_core::site::{validate_new_site, CreateSite};
use corral_core::types::DbId;
use corral_db::repositories::SiteRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::ListParams;
use crate::middleware::auth::GridUser;
use crate::response::{Created, DataResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitSite {
    pub credential: Credential,
}

#[derive(Debug, Deserialize)]
pub struct RemoveSite {
    #[serde(default)]
    pub force: bool,
    pub credential: Option<Credential>,
}

// ---------------------------------------------------------------------------
// POST /sites
// ---------------------------------------------------------------------------

/// Create a site owned by the caller. The site starts in NEW.
pub async fn create_site(
    user: GridUser,
    State(state): State<AppState>,
    Json(input): Json<CreateSite>,
) -> AppResult<impl IntoResponse> {
    let new = validate_new_site(input, &user.subject, &user.username, Utc::now())?;
    let svc = &state.services;
    let site = svc.sites.create(&svc.pool, &svc.netlogger, new).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: Created { id: site.id } }),
    ))
}

// ---------------------------------------------------------------------------
// GET /sites
// ---------------------------------------------------------------------------

pub async fn list_sites(
    user: GridUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let owner = params.owner_filter(&user.username);
    let sites = SiteRepo::list(&state.pool, owner.as_deref()).await?;
    tracing::debug!(count = sites.len(), owner = ?owner, "Listed sites");
    Ok(Json(DataResponse { data: sites }))
}

// ---------------------------------------------------------------------------
// GET /sites/{id}
// ---------------------------------------------------------------------------

pub async fn get_site(
    _user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let svc = &state.services;
    let site = svc.sites.find(&svc.pool, id).await?.get().await;
    Ok(Json(DataResponse { data: site }))
}

// ---------------------------------------------------------------------------
// GET /sites/{id}/history
// ---------------------------------------------------------------------------

/// State changes of a site, oldest first. Deleted sites keep their history.
pub async fn get_site_history(
    _user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let history = SiteRepo::history(&state.pool, id).await?;
    if history.is_empty() {
        return Err(CoreError::NotFound { entity: "Site", id }.into());
    }
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// POST /sites/{id}/submit
// ---------------------------------------------------------------------------

/// Store the delegated credential and start installing the site.
pub async fn submit_site(
    user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitSite>,
) -> AppResult<impl IntoResponse> {
    let svc = &state.services;
    let site = svc.sites.find(&svc.pool, id).await?;
    user.ensure_owner(site.authorized(&user.subject).await)?;

    site.submit(svc, &input.credential).await?;
    tracing::info!(site_id = id, subject = %user.subject, "Site submitted");
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// POST /sites/{id}/remove
// ---------------------------------------------------------------------------

/// Uninstall and delete the site. `force` skips the uninstall job.
pub async fn remove_site(
    user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RemoveSite>,
) -> AppResult<impl IntoResponse> {
    let svc = &state.services;
    let site = svc.sites.find(&svc.pool, id).await?;
    user.ensure_owner(site.authorized(&user.subject).await)?;

    site.remove(svc, input.force, input.credential.as_ref()).await?;
    tracing::info!(site_id = id, force = input.force, "Site removal requested");
    Ok(StatusCode::ACCEPTED)
}
