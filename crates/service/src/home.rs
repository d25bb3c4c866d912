//! In-memory caches of live resources, loaded from the database on demand.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use corral_core::error::CoreError;
use corral_core::glidein::{self, Glidein, NewGlidein};
use corral_core::netlogger::{NetLogger, NetLoggerEvent};
use corral_core::site::{NewSite, Site};
use corral_core::types::DbId;
use corral_db::repositories::{GlideinRepo, SiteRepo};
use corral_db::DbPool;
use tokio::sync::Mutex;

use crate::error::ServiceError;
use crate::glidein::GlideinResource;
use crate::services::audit;
use crate::site::SiteResource;

/// A resource that can be rebuilt from its database row.
#[async_trait]
pub trait Resource: Send + Sync + Sized + 'static {
    const ENTITY: &'static str;

    async fn load(pool: &DbPool, id: DbId) -> Result<Option<Self>, sqlx::Error>;
}

/// Cache of live resources keyed by ID.
///
/// Every caller that asks for the same ID gets the same `Arc`, so the
/// resource's own lock serializes work on it.
pub struct ResourceHome<R> {
    resources: Mutex<HashMap<DbId, Arc<R>>>,
}

pub type SiteHome = ResourceHome<SiteResource>;
pub type GlideinHome = ResourceHome<GlideinResource>;

impl<R: Resource> ResourceHome<R> {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached resource, loading it from the database on a miss.
    pub async fn find(&self, pool: &DbPool, id: DbId) -> Result<Arc<R>, ServiceError> {
        let mut resources = self.resources.lock().await;
        if let Some(resource) = resources.get(&id) {
            return Ok(resource.clone());
        }
        let resource = R::load(pool, id).await?.ok_or(CoreError::NotFound {
            entity: R::ENTITY,
            id,
        })?;
        let resource = Arc::new(resource);
        resources.insert(id, resource.clone());
        Ok(resource)
    }

    pub async fn remove(&self, id: DbId) -> Option<Arc<R>> {
        self.resources.lock().await.remove(&id)
    }

    async fn insert(&self, id: DbId, resource: R) -> Arc<R> {
        let resource = Arc::new(resource);
        self.resources.lock().await.insert(id, resource.clone());
        resource
    }
}

impl<R: Resource> Default for ResourceHome<R> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

impl ResourceHome<SiteResource> {
    pub async fn create(
        &self,
        pool: &DbPool,
        netlogger: &NetLogger,
        new: NewSite,
    ) -> Result<Site, ServiceError> {
        let site = SiteRepo::create(pool, &new).await?;
        tracing::info!(site_id = site.id, name = %site.name, "Created site");

        audit(
            netlogger,
            NetLoggerEvent::new("site.new")
                .with_ts(site.created)
                .put("site.id", site.id)
                .put("site.name", &site.name)
                .put("owner.subject", &site.subject)
                .put("owner.username", &site.local_username),
        )
        .await;

        self.insert(site.id, SiteResource::new(site.clone())).await;
        Ok(site)
    }
}

impl ResourceHome<GlideinResource> {
    /// Create a glidein for an existing site.
    ///
    /// The site's lock is held while the row is written so the site cannot
    /// start going away between the check and the insert.
    pub async fn create(
        &self,
        pool: &DbPool,
        netlogger: &NetLogger,
        sites: &SiteHome,
        mut new: NewGlidein,
    ) -> Result<Glidein, ServiceError> {
        let site = sites.find(pool, new.request.site_id).await?;
        let created = {
            let site = site.lock().await;
            glidein::ensure_site_accepts_glideins(site.state)?;
            new.site_name = site.name.clone();
            GlideinRepo::create(pool, &new).await?
        };
        tracing::info!(glidein_id = created.id, site_id = created.site_id, "Created glidein");

        let g = &created;
        audit(
            netlogger,
            NetLoggerEvent::new("glidein.new")
                .with_ts(Utc::now())
                .put("glidein.id", g.id)
                .put("site.id", g.site_id)
                .put("condor.host", &g.condor_host)
                .put_opt("condor.debug", g.condor_debug.as_deref())
                .put("count", g.count)
                .put("host_count", g.host_count)
                .put("wall_time", g.wall_time)
                .put("num_cpus", g.num_cpus)
                .put_opt("gcb_broker", g.gcb_broker.as_deref())
                .put_opt("idle_time", g.idle_time)
                .put("resubmit", g.resubmit)
                .put_time("until", g.until)
                .put_opt("resubmits", g.resubmits)
                .put_opt("rsl", g.rsl.as_deref())
                .put_opt("lowport", g.lowport)
                .put_opt("highport", g.highport)
                .put_opt("ccb_address", g.ccb_address.as_deref())
                .put("owner.subject", &g.subject)
                .put("owner.username", &g.local_username),
        )
        .await;

        self.insert(created.id, GlideinResource::new(created.clone())).await;
        Ok(created)
    }
}

#[async_trait]
impl Resource for SiteResource {
    const ENTITY: &'static str = "Site";

    async fn load(pool: &DbPool, id: DbId) -> Result<Option<Self>, sqlx::Error> {
        Ok(SiteRepo::find_by_id(pool, id).await?.map(SiteResource::new))
    }
}

#[async_trait]
impl Resource for GlideinResource {
    const ENTITY: &'static str = "Glidein";

    async fn load(pool: &DbPool, id: DbId) -> Result<Option<Self>, sqlx::Error> {
        Ok(GlideinRepo::find_by_id(pool, id).await?.map(GlideinResource::new))
    }
}
