//! Shared setup for the HTTP integration tests.
//!
//! The app runs against the real middleware stack with a fake Condor runner.
//! Nothing consumes the event queue unless a test calls [`TestApp::pump`].

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use corral_api::config::ServerConfig;
use corral_api::router::build_app_router;
use corral_api::state::AppState;
use corral_condor::{CondorError, CondorJob, CondorRunner};
use corral_core::gridmap::GridMap;
use corral_core::netlogger::NetLogger;
use corral_events::{Event, EventHandler, EventQueue};
use corral_service::{ResourceEventHandler, ServiceConfig, Services};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const SUBJECT: &str = "/DC=org/DC=doegrids/OU=People/CN=Gideon Juve";
pub const USERNAME: &str = "juve";
pub const OTHER_SUBJECT: &str = "/DC=org/DC=doegrids/OU=People/CN=Ewa Deelman";
pub const OTHER_USERNAME: &str = "deelman";
pub const UNMAPPED_SUBJECT: &str = "/DC=org/DC=doegrids/OU=People/CN=Nobody";

/// The pages as checked in, rather than an installed copy.
pub fn pages_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("web")
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8443".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: "sqlite::memory:".to_string(),
        web_dir: pages_dir(),
    }
}

pub fn test_gridmap() -> GridMap {
    GridMap::parse(&format!(
        "\"{SUBJECT}\" {USERNAME}\n\"{OTHER_SUBJECT}\" {OTHER_USERNAME}\n"
    ))
}

/// Condor stand-in that accepts every submit without running anything.
#[derive(Default)]
pub struct FakeRunner {
    next_id: AtomicU32,
}

#[async_trait]
impl CondorRunner for FakeRunner {
    async fn submit(&self, job: &mut CondorJob) -> Result<(), CondorError> {
        job.write_submit_file().await?;
        let cluster = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        job.job_id = Some(format!("{cluster}.0"));
        job.save_job_id().await
    }

    async fn cancel(&self, _job: &CondorJob) -> Result<(), CondorError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub svc: Arc<Services>,
    pub dir: TempDir,
    receiver: UnboundedReceiver<Event>,
    handler: ResourceEventHandler,
    cancel: CancellationToken,
}

impl TestApp {
    /// Handle queued events until the queue is empty.
    pub async fn pump(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.handler.handle(event).await;
        }
    }

    pub async fn get(&self, uri: &str, subject: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, subject, None).await
    }

    pub async fn post_json(&self, uri: &str, subject: Option<&str>, body: Value) -> Response<Body> {
        self.send(Method::POST, uri, subject, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        subject: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            builder = builder.header("x-client-subject", subject);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(request).await
    }

    /// Send a hand-built request through the full middleware stack.
    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create the standard test site as `subject` and return its id.
    pub async fn create_site(&self, subject: &str) -> i64 {
        let response = self.post_json("/api/v1/sites", Some(subject), site_body()).await;
        assert_eq!(response.status(), 201);
        body_json(response).await["data"]["id"].as_i64().unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Build the full application router, using the given database pool.
pub fn build_test_app(pool: SqlitePool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::with_home(dir.path());
    let netlogger = NetLogger::open(&config.netlogger_file).unwrap();
    let (queue, receiver) = EventQueue::new();
    let cancel = CancellationToken::new();

    let svc = Arc::new(Services::new(
        pool.clone(),
        config,
        queue,
        Arc::new(FakeRunner::default()),
        netlogger,
        cancel.clone(),
    ));

    let server_config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(server_config.clone()),
        services: svc.clone(),
        gridmap: Arc::new(test_gridmap()),
    };

    TestApp {
        router: build_app_router(state, &server_config),
        handler: ResourceEventHandler::new(svc.clone()),
        svc,
        dir,
        receiver,
        cancel,
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn site_body() -> Value {
    json!({
        "name": "abe",
        "install_path": "/u/ac/juve/glidein",
        "local_path": "/cfs/scratch/juve/glidein",
        "staging_service": {
            "service_type": "GT2",
            "service_contact": "grid-abe.ncsa.teragrid.org/jobmanager-fork",
            "project": "TG-CCR080002N",
            "queue": "normal"
        },
        "glidein_service": {
            "service_type": "GT2",
            "service_contact": "grid-abe.ncsa.teragrid.org/jobmanager-pbs",
            "project": "TG-CCR080002N",
            "queue": "normal"
        },
        "condor_version": "7.2.4"
    })
}

/// Credential JSON that expires `hours` from now.
pub fn credential(hours: i64) -> Value {
    json!({
        "pem": "-----BEGIN CERTIFICATE-----\nMIIC\n-----END CERTIFICATE-----\n",
        "expires_at": Utc::now() + Duration::hours(hours),
    })
}
