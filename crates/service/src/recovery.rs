use corral_db::repositories::{GlideinRepo, SiteRepo};

use crate::error::ServiceError;
use crate::services::Services;

/// Resume every site and then every glidein after a restart.
///
/// A resource that cannot be loaded is logged and skipped.
pub async fn recover_all(svc: &Services) -> Result<(), ServiceError> {
    let site_ids = SiteRepo::list_ids(&svc.pool).await?;
    tracing::info!(count = site_ids.len(), "Recovering sites");
    for id in site_ids {
        match svc.sites.find(&svc.pool, id).await {
            Ok(site) => site.recover(svc).await,
            Err(e) => tracing::error!(site_id = id, error = %e, "Unable to recover site"),
        }
    }

    let glidein_ids = GlideinRepo::list_ids(&svc.pool).await?;
    tracing::info!(count = glidein_ids.len(), "Recovering glideins");
    for id in glidein_ids {
        match svc.glideins.find(&svc.pool, id).await {
            Ok(glidein) => glidein.recover(svc).await,
            Err(e) => tracing::error!(glidein_id = id, error = %e, "Unable to recover glidein"),
        }
    }
    Ok(())
}
