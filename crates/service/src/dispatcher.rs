use std::sync::Arc;

use async_trait::async_trait;
use corral_events::{Event, EventHandler};

use crate::services::Services;

/// Routes queued events to the resource they are addressed to.
pub struct ResourceEventHandler {
    services: Arc<Services>,
}

impl ResourceEventHandler {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl EventHandler for ResourceEventHandler {
    async fn handle(&self, event: Event) {
        let svc = &self.services;
        match event {
            Event::Site(event) => match svc.sites.find(&svc.pool, event.site_id).await {
                Ok(site) => site.handle_event(svc, event).await,
                Err(e) => tracing::error!(
                    site_id = event.site_id,
                    code = %event.code,
                    error = %e,
                    "Unable to deliver site event"
                ),
            },
            Event::Glidein(event) => match svc.glideins.find(&svc.pool, event.glidein_id).await {
                Ok(glidein) => glidein.handle_event(svc, event).await,
                Err(e) => tracing::error!(
                    glidein_id = event.glidein_id,
                    code = %event.code,
                    error = %e,
                    "Unable to deliver glidein event"
                ),
            },
        }
    }
}
