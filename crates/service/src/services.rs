use std::path::PathBuf;
use std::sync::Arc;

use corral_condor::{CondorJob, CondorRunner, JobListener, JobMonitor};
use corral_core::netlogger::{NetLogger, NetLoggerEvent};
use corral_core::types::DbId;
use corral_db::DbPool;
use corral_events::EventQueue;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::home::{GlideinHome, SiteHome};

/// Everything the site and glidein state machines need, shared behind an
/// `Arc` by the dispatcher, the HTTP layer and the cleaner.
pub struct Services {
    pub pool: DbPool,
    pub config: ServiceConfig,
    pub queue: EventQueue,
    pub condor: Arc<dyn CondorRunner>,
    pub netlogger: NetLogger,
    pub sites: SiteHome,
    pub glideins: GlideinHome,
    /// Parent of every log tailer's token.
    pub cancel: CancellationToken,
    tailers: Mutex<JoinSet<()>>,
}

impl Services {
    pub fn new(
        pool: DbPool,
        config: ServiceConfig,
        queue: EventQueue,
        condor: Arc<dyn CondorRunner>,
        netlogger: NetLogger,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pool,
            config,
            queue,
            condor,
            netlogger,
            sites: SiteHome::new(),
            glideins: GlideinHome::new(),
            cancel,
            tailers: Mutex::new(JoinSet::new()),
        }
    }

    pub fn site_dir(&self, id: DbId) -> PathBuf {
        self.config.working_directory.join(format!("site-{id}"))
    }

    pub fn glidein_dir(&self, id: DbId) -> PathBuf {
        self.config.working_directory.join(format!("glidein-{id}"))
    }

    /// Follow a submitted job's log in the background.
    pub async fn follow(
        &self,
        job: CondorJob,
        listener: Arc<dyn JobListener>,
    ) -> Result<(), ServiceError> {
        let monitor = JobMonitor::new(job, listener, self.condor.clone());
        let watch =
            corral_condor::watch(monitor, self.config.poll_interval(), self.cancel.child_token())?;

        let mut tailers = self.tailers.lock().await;
        while let Some(done) = tailers.try_join_next() {
            report_tailer(done);
        }
        tailers.spawn(watch);
        Ok(())
    }

    /// Number of log tailers that have not been joined yet.
    pub async fn tailer_count(&self) -> usize {
        self.tailers.lock().await.len()
    }

    /// Wait for every log tailer to finish. Tailers only stop on their own
    /// when their job ends, so cancel `self.cancel` first at shutdown.
    pub async fn join_tailers(&self) -> usize {
        let mut tailers = std::mem::take(&mut *self.tailers.lock().await);
        let mut joined = 0;
        while let Some(done) = tailers.join_next().await {
            report_tailer(done);
            joined += 1;
        }
        tracing::debug!(joined, "Log tailers stopped");
        joined
    }

    pub async fn audit(&self, event: NetLoggerEvent) {
        audit(&self.netlogger, event).await;
    }
}

fn report_tailer(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Log tailer panicked");
        }
    }
}

/// Append to the NetLogger log. Failures are only reported.
pub(crate) async fn audit(netlogger: &NetLogger, event: NetLoggerEvent) {
    if let Err(e) = netlogger.log(&event).await {
        tracing::warn!(event = event.event(), error = %e, "Unable to write NetLogger event");
    }
}

/// Remove a resource's working directory, treating a missing one as gone.
pub(crate) async fn remove_dir(path: &std::path::Path) -> Result<(), ServiceError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
