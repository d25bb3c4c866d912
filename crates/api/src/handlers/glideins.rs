//! Handlers for glideins.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use corral_core::credential::Credential;
use corral_core::error::CoreError;
use corral_core::glidein::{validate_new_glidein, CreateGlidein};
use corral_core::types::DbId;
use corral_db::repositories::GlideinRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::ListParams;
use crate::middleware::auth::GridUser;
use crate::response::{Created, DataResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitGlidein {
    pub credential: Credential,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveGlidein {
    #[serde(default)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// POST /glideins
// ---------------------------------------------------------------------------

/// Create a glidein on an existing site. Fails with 409 when the site is
/// failed or going away.
pub async fn create_glidein(
    user: GridUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGlidein>,
) -> AppResult<impl IntoResponse> {
    let new = validate_new_glidein(input, &user.subject, &user.username, Utc::now())?;
    let svc = &state.services;
    let glidein = svc
        .glideins
        .create(&svc.pool, &svc.netlogger, &svc.sites, new)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: Created { id: glidein.id } }),
    ))
}

// ---------------------------------------------------------------------------
// GET /glideins
// ---------------------------------------------------------------------------

pub async fn list_glideins(
    user: GridUser,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let owner = params.owner_filter(&user.username);
    let glideins = GlideinRepo::list(&state.pool, owner.as_deref()).await?;
    tracing::debug!(count = glideins.len(), owner = ?owner, "Listed glideins");
    Ok(Json(DataResponse { data: glideins }))
}

// ---------------------------------------------------------------------------
// GET /glideins/{id}
// ---------------------------------------------------------------------------

pub async fn get_glidein(
    _user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let svc = &state.services;
    let glidein = svc.glideins.find(&svc.pool, id).await?.get().await;
    Ok(Json(DataResponse { data: glidein }))
}

// ---------------------------------------------------------------------------
// GET /glideins/{id}/history
// ---------------------------------------------------------------------------

/// State changes of a glidein, oldest first. Deleted glideins keep their history.
pub async fn get_glidein_history(
    _user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let history = GlideinRepo::history(&state.pool, id).await?;
    if history.is_empty() {
        return Err(CoreError::NotFound { entity: "Glidein", id }.into());
    }
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// POST /glideins/{id}/submit
// ---------------------------------------------------------------------------

pub async fn submit_glidein(
    user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitGlidein>,
) -> AppResult<impl IntoResponse> {
    let svc = &state.services;
    let glidein = svc.glideins.find(&svc.pool, id).await?;
    user.ensure_owner(glidein.authorized(&user.subject).await)?;

    glidein.submit(svc, &input.credential).await?;
    tracing::info!(glidein_id = id, subject = %user.subject, "Glidein submitted");
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// POST /glideins/{id}/remove
// ---------------------------------------------------------------------------

pub async fn remove_glidein(
    user: GridUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RemoveGlidein>,
) -> AppResult<impl IntoResponse> {
    let svc = &state.services;
    let glidein = svc.glideins.find(&svc.pool, id).await?;
    user.ensure_owner(glidein.authorized(&user.subject).await)?;

    glidein.remove(svc, input.force).await;
    tracing::info!(glidein_id = id, force = input.force, "Glidein removal requested");
    Ok(StatusCode::ACCEPTED)
}
