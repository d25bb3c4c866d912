//! Glidein state machine.

use std::sync::Arc;

use chrono::Utc;
use corral_condor::CondorJob;
use corral_core::credential::Credential;
use corral_core::error::{error_chain, short_failure_message};
use corral_core::glidein::Glidein;
use corral_core::netlogger::NetLoggerEvent;
use corral_core::state::{GlideinState, SiteState};
use corral_core::types::Timestamp;
use corral_db::repositories::GlideinRepo;
use corral_events::{GlideinEvent, GlideinEventCode, SiteEvent, SiteEventCode};
use tokio::sync::{Mutex, MutexGuard};

use crate::credential;
use crate::error::{ResultExt, ServiceError};
use crate::jobs::{self, CUSTOM_CONDOR_CONFIG};
use crate::listeners::GlideinListener;
use crate::services::{remove_dir, Services};

pub struct GlideinResource {
    glidein: Mutex<Glidein>,
}

impl GlideinResource {
    pub fn new(glidein: Glidein) -> Self {
        Self {
            glidein: Mutex::new(glidein),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Glidein> {
        self.glidein.lock().await
    }

    pub async fn get(&self) -> Glidein {
        self.glidein.lock().await.clone()
    }

    pub async fn authorized(&self, subject: &str) -> bool {
        self.glidein.lock().await.is_owned_by(subject)
    }

    /// Save the credential and queue the glidein for submission.
    pub async fn submit(&self, svc: &Services, credential: &Credential) -> Result<(), ServiceError> {
        let glidein = self.glidein.lock().await;
        let dir = svc.glidein_dir(glidein.id);
        tokio::fs::create_dir_all(&dir)
            .await
            .context("Unable to create glidein directory")?;
        credential::store(&dir.join("credential"), credential).await?;
        svc.queue.add(GlideinEvent::new(GlideinEventCode::Submit, glidein.id));
        Ok(())
    }

    pub async fn remove(&self, svc: &Services, force: bool) {
        let glidein = self.glidein.lock().await;
        let code = if force {
            GlideinEventCode::Delete
        } else {
            GlideinEventCode::Remove
        };
        svc.queue.add(GlideinEvent::new(code, glidein.id));
    }

    pub async fn handle_event(&self, svc: &Services, event: GlideinEvent) {
        let mut glidein = self.glidein.lock().await;
        if glidein.state == GlideinState::Deleted {
            tracing::warn!(glidein_id = glidein.id, code = %event.code, "Event for deleted glidein ignored");
            return;
        }

        if let Err(e) = process(&mut glidein, svc, &event).await {
            tracing::warn!(glidein_id = glidein.id, code = %event.code, error = %e, "Unable to process event");
            let message = short_failure_message(&e.to_string());
            fail(&mut glidein, svc, &message, Some(error_chain(&e)), event.time).await;
        }
    }

    pub async fn recover(&self, svc: &Services) {
        let mut glidein = self.glidein.lock().await;
        tracing::info!(glidein_id = glidein.id, state = %glidein.state, "Recovering glidein");

        let result = match glidein.state {
            GlideinState::New | GlideinState::Waiting => Ok(()),
            GlideinState::Submitted => recover_submitted(&mut glidein, svc).await,
            GlideinState::Queued | GlideinState::Running => follow(&glidein, svc).await,
            GlideinState::Removing => {
                let job = job_stub(&glidein, svc);
                if tokio::fs::try_exists(job.log_path()).await.unwrap_or(false) {
                    if let Err(e) = cancel_job(&glidein, svc).await {
                        tracing::warn!(glidein_id = glidein.id, error = %e, "Unable to cancel job on recovery");
                    }
                }
                Ok(())
            }
            GlideinState::Failed | GlideinState::Finished | GlideinState::Deleted => {
                svc.queue.add(GlideinEvent::new(GlideinEventCode::Delete, glidein.id));
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(glidein_id = glidein.id, error = %e, "Glidein recovery failed");
            fail(&mut glidein, svc, "State recovery failed", Some(error_chain(&e)), Utc::now()).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

fn unexpected(glidein: &Glidein, code: GlideinEventCode) {
    tracing::warn!(
        glidein_id = glidein.id,
        code = %code,
        state = %glidein.state,
        "Event received in unexpected state"
    );
}

async fn site_state(glidein: &Glidein, svc: &Services) -> Result<SiteState, ServiceError> {
    let site = svc.sites.find(&svc.pool, glidein.site_id).await?;
    let state = site.lock().await.state;
    Ok(state)
}

async fn process(
    glidein: &mut Glidein,
    svc: &Services,
    event: &GlideinEvent,
) -> Result<(), ServiceError> {
    use GlideinEventCode as Code;
    let time = event.time;

    match event.code {
        Code::Submit => {
            if glidein.state != GlideinState::New {
                unexpected(glidein, event.code);
                return Ok(());
            }
            if site_state(glidein, svc).await? == SiteState::Ready {
                start(glidein, svc, time).await?;
            } else {
                let message = "Waiting for site to be READY";
                update_state(glidein, svc, GlideinState::Waiting, message, None, time).await?;
            }
        }
        Code::SiteReady => {
            if glidein.state == GlideinState::Waiting {
                start(glidein, svc, time).await?;
            }
        }
        Code::SiteFailed => {
            if glidein.state.has_active_job() {
                if let Err(e) = cancel_job(glidein, svc).await {
                    tracing::warn!(glidein_id = glidein.id, error = %e, "Unable to cancel glidein job");
                }
            }
            fail(glidein, svc, "Site failed", None, time).await;
        }
        Code::Queued => {
            if glidein.state != GlideinState::Submitted {
                unexpected(glidein, event.code);
                return Ok(());
            }
            update_state(glidein, svc, GlideinState::Queued, "Glidein job queued", None, time).await?;
        }
        Code::Running => {
            if !matches!(glidein.state, GlideinState::Submitted | GlideinState::Queued) {
                unexpected(glidein, event.code);
                return Ok(());
            }
            update_state(glidein, svc, GlideinState::Running, "Glidein job running", None, time)
                .await?;
        }
        Code::Remove => {
            if glidein.state.has_active_job() {
                update_state(glidein, svc, GlideinState::Removing, "Cancelling job", None, time)
                    .await?;
                cancel_job(glidein, svc).await?;
            } else {
                deleted(glidein, svc, time).await?;
            }
        }
        Code::JobSuccess => match glidein.state {
            GlideinState::Running => {
                if glidein.should_resubmit(Utc::now())
                    && site_state(glidein, svc).await? == SiteState::Ready
                {
                    start(glidein, svc, time).await?;
                } else {
                    update_state(glidein, svc, GlideinState::Finished, "Glidein finished", None, time)
                        .await?;
                }
            }
            // The job finished before condor_rm got to it.
            GlideinState::Removing => deleted(glidein, svc, time).await?,
            _ => unexpected(glidein, event.code),
        },
        Code::Delete => deleted(glidein, svc, time).await?,
        Code::JobAborted => {
            if glidein.state == GlideinState::Removing {
                deleted(glidein, svc, time).await?;
            } else {
                let long_message = glidein.long_message.clone();
                update_state(glidein, svc, GlideinState::Failed, "Glidein aborted", long_message, time)
                    .await?;
            }
        }
        Code::JobFailure => {
            let message = event.message.as_deref().unwrap_or("Glidein failed");
            fail(glidein, svc, message, event.long_message.clone(), time).await;
        }
    }
    Ok(())
}

async fn start(glidein: &mut Glidein, svc: &Services, time: Timestamp) -> Result<(), ServiceError> {
    update_state(glidein, svc, GlideinState::Submitted, "Local job submitted", None, time).await?;
    submit_job(glidein, svc).await
}

async fn deleted(glidein: &mut Glidein, svc: &Services, time: Timestamp) -> Result<(), ServiceError> {
    update_state(glidein, svc, GlideinState::Deleted, "Glidein deleted", None, time).await?;
    delete(glidein, svc).await
}

async fn fail(
    glidein: &mut Glidein,
    svc: &Services,
    message: &str,
    long_message: Option<String>,
    time: Timestamp,
) {
    if let Err(e) =
        update_state(glidein, svc, GlideinState::Failed, message, long_message, time).await
    {
        tracing::error!(glidein_id = glidein.id, error = %e, "Unable to mark glidein failed");
    }
}

async fn update_state(
    glidein: &mut Glidein,
    svc: &Services,
    state: GlideinState,
    short_message: &str,
    long_message: Option<String>,
    time: Timestamp,
) -> Result<(), ServiceError> {
    tracing::info!(glidein_id = glidein.id, from = %glidein.state, to = %state, "Glidein state change");

    GlideinRepo::update_state(
        &svc.pool,
        glidein.id,
        state,
        short_message,
        long_message.as_deref(),
        time,
    )
    .await?;
    glidein.state = state;
    glidein.short_message = short_message.to_string();
    glidein.long_message = long_message;
    glidein.last_update = time;

    svc.audit(
        NetLoggerEvent::new(state.event_name())
            .with_ts(time)
            .put("glidein.id", glidein.id)
            .put("message", short_message),
    )
    .await;
    Ok(())
}

/// Drop the glidein everywhere and let its site know.
async fn delete(glidein: &Glidein, svc: &Services) -> Result<(), ServiceError> {
    tracing::info!(glidein_id = glidein.id, "Deleting glidein");
    svc.glideins.remove(glidein.id).await;
    GlideinRepo::delete(&svc.pool, glidein.id).await?;
    svc.queue.add(SiteEvent::new(SiteEventCode::GlideinDeleted, glidein.site_id));
    remove_dir(&svc.glidein_dir(glidein.id)).await
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

fn job_stub(glidein: &Glidein, svc: &Services) -> CondorJob {
    CondorJob::new(svc.glidein_dir(glidein.id).join("job"))
}

async fn submit_job(glidein: &mut Glidein, svc: &Services) -> Result<(), ServiceError> {
    let site = svc.sites.find(&svc.pool, glidein.site_id).await?.get().await;

    let dir = svc.glidein_dir(glidein.id);
    let credential = credential::load(&dir.join("credential")).await?;
    let needed = i64::from(glidein.wall_time) * 60;
    if !credential.covers(needed, Utc::now()) {
        return Err(ServiceError::msg("Not enough time on credential"));
    }

    let job_dir = dir.join("job");
    remove_dir(&job_dir).await?;
    tokio::fs::create_dir_all(&job_dir)
        .await
        .context("Unable to create job directory")?;

    let condor_config = match &glidein.condor_config {
        Some(contents) => {
            tokio::fs::write(job_dir.join(CUSTOM_CONDOR_CONFIG), contents)
                .await
                .context("Unable to write glidein condor_config")?;
            CUSTOM_CONDOR_CONFIG.to_string()
        }
        None => svc.config.glidein_condor_config.display().to_string(),
    };

    let mut job = jobs::glidein_job(glidein, &site, &svc.config, job_dir, condor_config);
    credential::write_proxy(&job.credential_path(), &credential).await?;
    job.credential = Some(job.credential_path());

    svc.condor
        .submit(&mut job)
        .await
        .context("Unable to submit glidein job")?;

    svc.audit(
        NetLoggerEvent::new("glidein.submit")
            .put("glidein.id", glidein.id)
            .put("site.id", glidein.site_id)
            .put_opt("condor.id", job.job_id.as_deref()),
    )
    .await;

    GlideinRepo::increment_submits(&svc.pool, glidein.id).await?;
    glidein.submits += 1;

    let listener = Arc::new(GlideinListener::new(glidein.id, svc.queue.clone()));
    svc.follow(job, listener).await
}

async fn cancel_job(glidein: &Glidein, svc: &Services) -> Result<(), ServiceError> {
    let mut job = job_stub(glidein, svc);
    job.load_job_id().await.context("Unable to cancel glidein job")?;
    svc.condor.cancel(&job).await.context("Unable to cancel glidein job")
}

async fn follow(glidein: &Glidein, svc: &Services) -> Result<(), ServiceError> {
    let mut job = job_stub(glidein, svc);
    job.load_job_id().await?;
    let listener = Arc::new(GlideinListener::new(glidein.id, svc.queue.clone()));
    svc.follow(job, listener).await
}

async fn recover_submitted(glidein: &mut Glidein, svc: &Services) -> Result<(), ServiceError> {
    if tokio::fs::try_exists(job_stub(glidein, svc).log_path()).await? {
        return follow(glidein, svc).await;
    }
    if tokio::fs::try_exists(svc.glidein_dir(glidein.id).join("credential")).await? {
        return submit_job(glidein, svc).await;
    }
    fail(glidein, svc, "Unable to submit glidein", None, Utc::now()).await;
    Ok(())
}
