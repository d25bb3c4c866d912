//! Grid identity extractor for Axum handlers.
//!
//! TLS termination happens in front of the service; the proxy forwards the
//! client certificate's subject DN in the `X-Client-Subject` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use corral_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the caller's certificate subject.
pub const CLIENT_SUBJECT_HEADER: &str = "x-client-subject";

/// Caller identified by certificate subject and mapped to a local account
/// through the grid-mapfile.
///
/// ```ignore
/// async fn my_handler(user: GridUser) -> AppResult<Json<()>> {
///     tracing::info!(subject = %user.subject, username = %user.username, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GridUser {
    pub subject: String,
    pub username: String,
}

impl GridUser {
    /// Reject callers that do not own the resource.
    pub fn ensure_owner(&self, owned: bool) -> Result<(), AppError> {
        if owned {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden("Not authorized".into())))
        }
    }
}

impl FromRequestParts<AppState> for GridUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(CLIENT_SUBJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing client subject".into()))
            })?;

        let username = state.gridmap.lookup(subject).ok_or_else(|| {
            tracing::warn!(subject, "Subject not in grid-mapfile");
            AppError::Core(CoreError::Forbidden(format!(
                "User {subject} not in grid-mapfile"
            )))
        })?;

        Ok(GridUser {
            subject: subject.to_string(),
            username: username.to_string(),
        })
    }
}
