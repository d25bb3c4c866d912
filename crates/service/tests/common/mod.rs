//! Shared harness for the state machine tests.
//!
//! Jobs are "submitted" to [`FakeRunner`], which writes the submit file and
//! a job id but never produces a log, so log tailers stay idle and tests
//! drive the resources by queueing events themselves.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use corral_condor::{CondorError, CondorJob, CondorRunner};
use corral_core::credential::Credential;
use corral_core::glidein::{validate_new_glidein, CreateGlidein, Glidein};
use corral_core::netlogger::NetLogger;
use corral_core::site::{validate_new_site, CreateSite, ExecutionServiceSpec, Site};
use corral_core::state::ServiceType;
use corral_events::{Event, EventHandler, EventQueue};
use corral_service::{ResourceEventHandler, ServiceConfig, Services};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

pub const SUBJECT: &str = "/DC=org/DC=doegrids/OU=People/CN=Gideon Juve";
pub const USERNAME: &str = "juve";

// ---------------------------------------------------------------------------
// Fake Condor
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRunner {
    next_id: AtomicU32,
    pub fail_submit: AtomicBool,
    pub submitted: Mutex<Vec<PathBuf>>,
    pub cancelled: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn submitted(&self) -> Vec<PathBuf> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl CondorRunner for FakeRunner {
    async fn submit(&self, job: &mut CondorJob) -> Result<(), CondorError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(CondorError::CommandFailed {
                command: "condor_submit",
                code: 1,
                stdout: String::new(),
                stderr: "ERROR: proxy has expired".to_string(),
            });
        }
        job.write_submit_file().await?;
        let cluster = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        job.job_id = Some(format!("{cluster}.0"));
        job.save_job_id().await?;
        self.submitted.lock().unwrap().push(job.job_dir().to_path_buf());
        Ok(())
    }

    async fn cancel(&self, job: &CondorJob) -> Result<(), CondorError> {
        let job_id = job.job_id.clone().ok_or(CondorError::NotSubmitted)?;
        self.cancelled.lock().unwrap().push(job_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub svc: Arc<Services>,
    pub runner: Arc<FakeRunner>,
    pub dir: TempDir,
    receiver: UnboundedReceiver<Event>,
    handler: ResourceEventHandler,
    cancel: CancellationToken,
}

impl Harness {
    pub fn new(pool: SqlitePool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::with_home(dir.path());
        config.service_host = "corral.example.edu".to_string();
        config.poll_interval_secs = 1;

        let netlogger = NetLogger::open(&config.netlogger_file).unwrap();
        let runner = Arc::new(FakeRunner::default());
        let (queue, receiver) = EventQueue::new();
        let cancel = CancellationToken::new();

        let svc = Arc::new(Services::new(
            pool,
            config,
            queue,
            runner.clone(),
            netlogger,
            cancel.clone(),
        ));
        let handler = ResourceEventHandler::new(svc.clone());

        Self {
            svc,
            runner,
            dir,
            receiver,
            handler,
            cancel,
        }
    }

    /// Handle queued events, including the ones they cause, until the
    /// queue is empty. Returns the events handled.
    pub async fn pump(&mut self) -> Vec<String> {
        let mut handled = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            handled.push(match &event {
                Event::Site(e) => format!("site {} {}", e.site_id, e.code),
                Event::Glidein(e) => format!("glidein {} {}", e.glidein_id, e.code),
            });
            self.handler.handle(event).await;
            assert!(handled.len() < 100, "event storm: {handled:?}");
        }
        handled
    }

    pub async fn create_site(&self) -> Site {
        let req = CreateSite {
            name: Some("abe".to_string()),
            install_path: Some("/u/ac/juve/glidein".to_string()),
            local_path: Some("/cfs/scratch/juve/glidein".to_string()),
            staging_service: Some(service(ServiceType::Gt2, "jobmanager-fork")),
            glidein_service: Some(service(ServiceType::Gt2, "jobmanager-pbs")),
            condor_version: Some("7.2.4".to_string()),
            condor_package: None,
            environment: vec![],
        };
        let new = validate_new_site(req, SUBJECT, USERNAME, Utc::now()).unwrap();
        self.svc
            .sites
            .create(&self.svc.pool, &self.svc.netlogger, new)
            .await
            .unwrap()
    }

    pub async fn create_glidein(&self, req: CreateGlidein) -> Glidein {
        let new = validate_new_glidein(req, SUBJECT, USERNAME, Utc::now()).unwrap();
        self.svc
            .glideins
            .create(&self.svc.pool, &self.svc.netlogger, &self.svc.sites, new)
            .await
            .unwrap()
    }

    /// Create a site and drive it to READY.
    pub async fn ready_site(&mut self) -> Site {
        let site = self.create_site().await;
        let resource = self.svc.sites.find(&self.svc.pool, site.id).await.unwrap();
        resource.submit(&self.svc, &credential(12)).await.unwrap();
        self.pump().await;
        self.svc.queue.add(corral_events::SiteEvent::new(
            corral_events::SiteEventCode::InstallSuccess,
            site.id,
        ));
        self.pump().await;
        resource.get().await
    }

    pub async fn site(&self, id: i64) -> Site {
        self.svc.sites.find(&self.svc.pool, id).await.unwrap().get().await
    }

    pub async fn glidein(&self, id: i64) -> Glidein {
        self.svc.glideins.find(&self.svc.pool, id).await.unwrap().get().await
    }

    pub fn netlog(&self) -> String {
        std::fs::read_to_string(&self.svc.config.netlogger_file).unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn service(service_type: ServiceType, jobmanager: &str) -> ExecutionServiceSpec {
    ExecutionServiceSpec {
        service_type: Some(service_type),
        service_contact: Some(format!("grid-abe.ncsa.teragrid.org/{jobmanager}")),
        project: Some("TG-CCR080002N".to_string()),
        queue: Some("normal".to_string()),
    }
}

/// A credential that expires `hours` from now.
pub fn credential(hours: i64) -> Credential {
    credential_for(Duration::hours(hours))
}

pub fn credential_for(lifetime: Duration) -> Credential {
    Credential {
        pem: "-----BEGIN CERTIFICATE-----\nMIIC\n-----END CERTIFICATE-----\n".to_string(),
        expires_at: Utc::now() + lifetime,
    }
}
