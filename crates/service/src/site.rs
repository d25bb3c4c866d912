//! Site state machine.
//!
//! Every transition happens under the site's lock, driven by events from
//! the dispatcher. Errors raised while handling an event fail the site.

use std::sync::Arc;

use chrono::Utc;
use corral_condor::CondorJob;
use corral_core::credential::{Credential, SITE_JOB_MIN_LIFETIME_SECS};
use corral_core::error::{error_chain, short_failure_message, CoreError};
use corral_core::netlogger::NetLoggerEvent;
use corral_core::site::Site;
use corral_core::state::SiteState;
use corral_core::types::{DbId, Timestamp};
use corral_db::repositories::SiteRepo;
use corral_events::{GlideinEvent, GlideinEventCode, SiteEvent, SiteEventCode};
use tokio::sync::{Mutex, MutexGuard};

use crate::credential;
use crate::error::{ResultExt, ServiceError};
use crate::jobs::{self, SiteJobKind};
use crate::listeners::SiteJobListener;
use crate::services::{remove_dir, Services};

#[derive(Debug)]
pub struct SiteResource {
    site: Mutex<Site>,
}

impl SiteResource {
    pub fn new(site: Site) -> Self {
        Self {
            site: Mutex::new(site),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Site> {
        self.site.lock().await
    }

    /// Current state of the site.
    pub async fn get(&self) -> Site {
        self.site.lock().await.clone()
    }

    pub async fn authorized(&self, subject: &str) -> bool {
        self.site.lock().await.is_owned_by(subject)
    }

    /// Save the credential and start installing the site.
    pub async fn submit(&self, svc: &Services, credential: &Credential) -> Result<(), ServiceError> {
        let site = self.site.lock().await;
        store_credential(svc, site.id, credential).await?;
        svc.queue.add(SiteEvent::new(SiteEventCode::Submit, site.id));
        Ok(())
    }

    /// Start removing the site. A forced remove deletes it without running
    /// the uninstall job.
    pub async fn remove(
        &self,
        svc: &Services,
        force: bool,
        credential: Option<&Credential>,
    ) -> Result<(), ServiceError> {
        let site = self.site.lock().await;
        if force {
            svc.queue.add(SiteEvent::new(SiteEventCode::Delete, site.id));
            return Ok(());
        }
        let credential = credential.ok_or_else(|| {
            CoreError::Validation("Must provide a credential to remove a site".to_string())
        })?;
        store_credential(svc, site.id, credential).await?;
        svc.queue.add(SiteEvent::new(SiteEventCode::Remove, site.id));
        Ok(())
    }

    pub async fn handle_event(&self, svc: &Services, event: SiteEvent) {
        let mut site = self.site.lock().await;
        if site.state == SiteState::Deleted {
            tracing::warn!(site_id = site.id, code = %event.code, "Event for deleted site ignored");
            return;
        }

        if let Err(e) = process(&mut site, svc, &event).await {
            tracing::warn!(site_id = site.id, code = %event.code, error = %e, "Unable to process event");
            let message = short_failure_message(&e.to_string());
            fail(&mut site, svc, &message, Some(error_chain(&e)), event.time).await;
        }
    }

    /// Bring the site back to life after a restart.
    pub async fn recover(&self, svc: &Services) {
        let mut site = self.site.lock().await;
        tracing::info!(site_id = site.id, state = %site.state, "Recovering site");

        let result = match site.state {
            SiteState::New | SiteState::Failed => Ok(()),
            SiteState::Staging => recover_job(&mut site, svc, SiteJobKind::Install).await,
            SiteState::Ready => notify_glideins(&site, svc, GlideinEventCode::SiteReady).await,
            SiteState::Exiting => notify_glideins(&site, svc, GlideinEventCode::Remove).await,
            SiteState::Removing => recover_job(&mut site, svc, SiteJobKind::Uninstall).await,
            SiteState::Deleted => delete(&site, svc).await,
        };

        if let Err(e) = result {
            tracing::error!(site_id = site.id, error = %e, "Site recovery failed");
            fail(&mut site, svc, "State recovery failed", Some(error_chain(&e)), Utc::now()).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

fn unexpected(site: &Site, code: SiteEventCode, required: SiteState) {
    tracing::warn!(
        site_id = site.id,
        code = %code,
        state = %site.state,
        required = %required,
        "Event received in unexpected state"
    );
}

async fn process(site: &mut Site, svc: &Services, event: &SiteEvent) -> Result<(), ServiceError> {
    let time = event.time;
    match event.code {
        SiteEventCode::Submit => {
            if site.state != SiteState::New {
                unexpected(site, event.code, SiteState::New);
                return Ok(());
            }
            update_state(site, svc, SiteState::Staging, "Staging executables", None, time).await?;
            submit_job(site, svc, SiteJobKind::Install).await?;
        }
        SiteEventCode::InstallSuccess => {
            if site.state != SiteState::Staging {
                unexpected(site, event.code, SiteState::Staging);
                return Ok(());
            }
            update_state(site, svc, SiteState::Ready, "Installed", None, time).await?;
            if let Err(e) = notify_glideins(site, svc, GlideinEventCode::SiteReady).await {
                tracing::warn!(site_id = site.id, error = %e, "Unable to notify glideins");
            }
        }
        SiteEventCode::InstallFailed => {
            if site.state != SiteState::Staging {
                unexpected(site, event.code, SiteState::Staging);
                return Ok(());
            }
            let message = event.message.as_deref().unwrap_or("Install job failed");
            fail(site, svc, message, event.long_message.clone(), time).await;
        }
        SiteEventCode::Remove => remove(site, svc, time).await?,
        SiteEventCode::GlideinDeleted => {
            if site.state == SiteState::Exiting && !SiteRepo::has_glideins(&svc.pool, site.id).await? {
                update_state(site, svc, SiteState::Removing, "Removing site", None, time).await?;
                submit_job(site, svc, SiteJobKind::Uninstall).await?;
            }
        }
        SiteEventCode::UninstallSuccess | SiteEventCode::Delete => {
            update_state(site, svc, SiteState::Deleted, "Site deleted", None, time).await?;
            delete(site, svc).await?;
        }
        SiteEventCode::UninstallFailed => {
            if site.state != SiteState::Removing {
                unexpected(site, event.code, SiteState::Removing);
                return Ok(());
            }
            let message = event.message.as_deref().unwrap_or("Uninstall job failed");
            fail(site, svc, message, event.long_message.clone(), time).await;
        }
    }
    Ok(())
}

async fn remove(site: &mut Site, svc: &Services, time: Timestamp) -> Result<(), ServiceError> {
    if site.state == SiteState::Removing {
        tracing::warn!(site_id = site.id, "Already removing site");
        return Ok(());
    }

    if site.state == SiteState::Staging {
        cancel_install_job(site, svc).await?;
    }

    if SiteRepo::has_glideins(&svc.pool, site.id).await? {
        update_state(site, svc, SiteState::Exiting, "Waiting for glideins", None, time).await?;
        notify_glideins(site, svc, GlideinEventCode::Remove).await
    } else {
        update_state(site, svc, SiteState::Removing, "Removing site", None, time).await?;
        submit_job(site, svc, SiteJobKind::Uninstall).await
    }
}

/// Record a failure and tell the glideins. Never fails itself.
async fn fail(
    site: &mut Site,
    svc: &Services,
    message: &str,
    long_message: Option<String>,
    time: Timestamp,
) {
    if let Err(e) = update_state(site, svc, SiteState::Failed, message, long_message, time).await {
        tracing::error!(site_id = site.id, error = %e, "Unable to mark site failed");
    }
    if let Err(e) = notify_glideins(site, svc, GlideinEventCode::SiteFailed).await {
        tracing::warn!(site_id = site.id, error = %e, "Unable to notify glideins of failure");
    }
}

async fn update_state(
    site: &mut Site,
    svc: &Services,
    state: SiteState,
    short_message: &str,
    long_message: Option<String>,
    time: Timestamp,
) -> Result<(), ServiceError> {
    tracing::info!(site_id = site.id, from = %site.state, to = %state, "Site state change");

    SiteRepo::update_state(&svc.pool, site.id, state, short_message, long_message.as_deref(), time)
        .await?;
    site.state = state;
    site.short_message = short_message.to_string();
    site.long_message = long_message;
    site.last_update = time;

    svc.audit(
        NetLoggerEvent::new(state.event_name())
            .with_ts(time)
            .put("site.id", site.id)
            .put("message", short_message),
    )
    .await;
    Ok(())
}

async fn notify_glideins(
    site: &Site,
    svc: &Services,
    code: GlideinEventCode,
) -> Result<(), ServiceError> {
    for id in SiteRepo::glidein_ids(&svc.pool, site.id).await? {
        svc.queue.add(GlideinEvent::new(code, id));
    }
    Ok(())
}

async fn delete(site: &Site, svc: &Services) -> Result<(), ServiceError> {
    tracing::info!(site_id = site.id, "Deleting site");
    svc.sites.remove(site.id).await;
    SiteRepo::delete(&svc.pool, site.id).await?;
    remove_dir(&svc.site_dir(site.id)).await
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

async fn store_credential(
    svc: &Services,
    id: DbId,
    credential: &Credential,
) -> Result<(), ServiceError> {
    let dir = svc.site_dir(id);
    tokio::fs::create_dir_all(&dir)
        .await
        .context("Unable to create site directory")?;
    credential::store(&dir.join("credential"), credential).await
}

fn job_for(site: &Site, svc: &Services, kind: SiteJobKind) -> CondorJob {
    let job_dir = svc.site_dir(site.id).join(kind.as_str());
    jobs::site_job(site, &svc.config, kind, job_dir)
}

async fn submit_job(site: &Site, svc: &Services, kind: SiteJobKind) -> Result<(), ServiceError> {
    let credential = credential::load(&svc.site_dir(site.id).join("credential")).await?;
    if !credential.covers(SITE_JOB_MIN_LIFETIME_SECS, Utc::now()) {
        return Err(ServiceError::msg("Not enough time left on credential"));
    }

    let mut job = job_for(site, svc, kind);
    remove_dir(job.job_dir()).await?;
    tokio::fs::create_dir_all(job.job_dir())
        .await
        .context("Unable to create job directory")?;
    credential::write_proxy(&job.credential_path(), &credential).await?;
    job.credential = Some(job.credential_path());

    let context = match kind {
        SiteJobKind::Install => "Unable to submit install job",
        SiteJobKind::Uninstall => "Unable to submit uninstall job",
    };
    svc.condor.submit(&mut job).await.context(context)?;

    svc.audit(
        NetLoggerEvent::new(format!("site.submit.{}", kind.as_str()))
            .put("site.id", site.id)
            .put_opt("condor.id", job.job_id.as_deref()),
    )
    .await;

    let listener = Arc::new(SiteJobListener::new(site.id, kind, svc.queue.clone()));
    svc.follow(job, listener).await
}

async fn cancel_install_job(site: &Site, svc: &Services) -> Result<(), ServiceError> {
    let mut job = job_for(site, svc, SiteJobKind::Install);
    job.load_job_id().await.context("Unable to cancel install job")?;
    svc.condor.cancel(&job).await.context("Unable to cancel install job")
}

/// Resume tailing the job log if the job was submitted, otherwise submit it.
async fn recover_job(site: &mut Site, svc: &Services, kind: SiteJobKind) -> Result<(), ServiceError> {
    let mut job = job_for(site, svc, kind);
    if tokio::fs::try_exists(job.log_path()).await? {
        job.load_job_id().await?;
        let listener = Arc::new(SiteJobListener::new(site.id, kind, svc.queue.clone()));
        return svc.follow(job, listener).await;
    }

    if tokio::fs::try_exists(svc.site_dir(site.id).join("credential")).await? {
        return submit_job(site, svc, kind).await;
    }

    fail(site, svc, "Unable to recover site", None, Utc::now()).await;
    Ok(())
}
