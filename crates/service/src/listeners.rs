//! Job listeners that turn Condor log callbacks into resource events.

use std::path::Path;

use async_trait::async_trait;
use corral_condor::{CondorEvent, CondorJob, JobListener};
use corral_core::error::error_chain;
use corral_core::types::DbId;
use corral_events::{EventQueue, GlideinEvent, GlideinEventCode, SiteEvent, SiteEventCode};

use crate::jobs::SiteJobKind;
use crate::services::remove_dir;

fn details(event: &CondorEvent) -> Option<String> {
    (!event.details.is_empty()).then(|| event.details.clone())
}

async fn discard_job_dir(job: &CondorJob) {
    if let Err(e) = remove_dir(job.job_dir()).await {
        tracing::warn!(dir = %job.job_dir().display(), error = %e, "Unable to remove job directory");
    }
}

// ---------------------------------------------------------------------------
// Site jobs
// ---------------------------------------------------------------------------

/// Follows an install or uninstall job for one site.
pub struct SiteJobListener {
    site_id: DbId,
    kind: SiteJobKind,
    queue: EventQueue,
}

impl SiteJobListener {
    pub fn new(site_id: DbId, kind: SiteJobKind, queue: EventQueue) -> Self {
        Self {
            site_id,
            kind,
            queue,
        }
    }

    fn failure_code(&self) -> SiteEventCode {
        match self.kind {
            SiteJobKind::Install => SiteEventCode::InstallFailed,
            SiteJobKind::Uninstall => SiteEventCode::UninstallFailed,
        }
    }

    fn success_code(&self) -> SiteEventCode {
        match self.kind {
            SiteJobKind::Install => SiteEventCode::InstallSuccess,
            SiteJobKind::Uninstall => SiteEventCode::UninstallSuccess,
        }
    }

    fn failure(&self, event: &CondorEvent, message: String, long_message: Option<String>) {
        let mut site_event = SiteEvent::new(self.failure_code(), self.site_id)
            .with_time(event.time)
            .with_message(message);
        site_event.long_message = long_message;
        self.queue.add(site_event);
    }

    /// The install scripts report problems in a `status` file because GT2
    /// does not return the exit code.
    async fn read_outputs(job: &CondorJob) -> std::io::Result<Option<String>> {
        let errors = tokio::fs::read_to_string(job.job_dir().join("status")).await?;
        if errors.is_empty() {
            return Ok(None);
        }
        let stdout = tokio::fs::read_to_string(job.output_path()).await?;
        let stderr = tokio::fs::read_to_string(job.error_path()).await?;
        Ok(Some(format!(
            "ERRORS:\n{errors}\n\nSTDOUT:\n{stdout}\n\nSTDERR:\n{stderr}"
        )))
    }
}

#[async_trait]
impl JobListener for SiteJobListener {
    async fn queued(&self, _event: &CondorEvent) {}

    async fn running(&self, _event: &CondorEvent) {}

    async fn terminated(&self, job: &CondorJob, event: &CondorEvent) {
        match Self::read_outputs(job).await {
            Ok(Some(report)) => {
                self.failure(event, format!("{} job failed", self.kind.title()), Some(report));
            }
            Ok(None) => {
                discard_job_dir(job).await;
                self.queue.add(
                    SiteEvent::new(self.success_code(), self.site_id).with_time(event.time),
                );
            }
            Err(e) => self.failure(
                event,
                format!("Unable to read {} job output file(s)", self.kind.as_str()),
                Some(error_chain(&e)),
            ),
        }
    }

    async fn failed(&self, event: &CondorEvent) {
        self.failure(event, event.message.clone(), details(event));
    }

    async fn aborted(&self, event: &CondorEvent) {
        self.failure(event, format!("{} job aborted", self.kind.title()), None);
    }
}

// ---------------------------------------------------------------------------
// Glidein jobs
// ---------------------------------------------------------------------------

/// Follows the Condor job of one glidein.
pub struct GlideinListener {
    glidein_id: DbId,
    queue: EventQueue,
}

impl GlideinListener {
    pub fn new(glidein_id: DbId, queue: EventQueue) -> Self {
        Self { glidein_id, queue }
    }

    fn event_for(&self, code: GlideinEventCode, event: &CondorEvent) -> GlideinEvent {
        GlideinEvent::new(code, self.glidein_id).with_time(event.time)
    }

    fn failure(&self, event: &CondorEvent, message: impl Into<String>, long_message: Option<String>) {
        let mut glidein_event = self
            .event_for(GlideinEventCode::JobFailure, event)
            .with_message(message);
        glidein_event.long_message = long_message;
        self.queue.add(glidein_event);
    }
}

/// First line of the glidein's stderr, used as the short failure message.
fn first_line(stderr: &str) -> &str {
    stderr.lines().next().unwrap_or_default()
}

async fn read_error_file(path: &Path) -> std::io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl JobListener for GlideinListener {
    async fn queued(&self, event: &CondorEvent) {
        self.queue.add(self.event_for(GlideinEventCode::Queued, event));
    }

    async fn running(&self, event: &CondorEvent) {
        self.queue.add(self.event_for(GlideinEventCode::Running, event));
    }

    async fn terminated(&self, job: &CondorJob, event: &CondorEvent) {
        // A glidein that exits cleanly writes nothing to stderr.
        match read_error_file(&job.error_path()).await {
            Ok(Some(stderr)) if !stderr.is_empty() => {
                let message = format!("Glidein failed: {}", first_line(&stderr));
                self.failure(event, message, Some(stderr));
            }
            Ok(Some(_)) => {
                discard_job_dir(job).await;
                self.queue.add(self.event_for(GlideinEventCode::JobSuccess, event));
            }
            Ok(None) => self.failure(event, "Glidein job produced no error file", None),
            Err(e) => self.failure(event, "Unable to read error file", Some(error_chain(&e))),
        }
    }

    async fn failed(&self, event: &CondorEvent) {
        self.failure(event, event.message.clone(), details(event));
    }

    async fn aborted(&self, event: &CondorEvent) {
        self.queue.add(
            self.event_for(GlideinEventCode::JobAborted, event)
                .with_message(event.message.clone()),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
