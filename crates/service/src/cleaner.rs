//! Periodic removal of glideins that have finished or failed.

use std::sync::Arc;

use corral_core::state::GlideinState;
use corral_db::repositories::GlideinRepo;
use corral_events::{GlideinEvent, GlideinEventCode};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::services::Services;

const TERMINAL: &[GlideinState] = &[GlideinState::Finished, GlideinState::Failed];

/// Queue a DELETE for every finished or failed glidein. Returns how many
/// were queued.
pub async fn sweep(svc: &Services) -> Result<usize, ServiceError> {
    let ids = GlideinRepo::list_ids_in_states(&svc.pool, TERMINAL).await?;
    for id in &ids {
        svc.queue.add(GlideinEvent::new(GlideinEventCode::Delete, *id));
    }
    Ok(ids.len())
}

/// Run [`sweep`] every `cleanup_interval` until cancelled.
pub async fn run(svc: Arc<Services>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(svc.config.cleanup_interval());
    // The first tick completes immediately.
    interval.tick().await;
    tracing::info!(interval_secs = svc.config.cleanup_interval_secs, "Resource cleaner started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Resource cleaner stopping");
                break;
            }
            _ = interval.tick() => match sweep(&svc).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Queued removal of terminated glideins"),
                Err(e) => tracing::error!(error = %e, "Resource cleanup failed"),
            },
        }
    }
}
