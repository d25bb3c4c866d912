use std::sync::Arc;

use corral_core::gridmap::GridMap;
use corral_service::Services;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: corral_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Resource homes, event queue and Condor access.
    pub services: Arc<Services>,
    /// Subject DN to local account mapping used by [`GridUser`](crate::middleware::auth::GridUser).
    pub gridmap: Arc<GridMap>,
}
