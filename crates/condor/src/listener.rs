//! Mapping user-log events onto job lifecycle callbacks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::event::{CondorEvent, CondorEventCode};
use crate::job::CondorJob;
use crate::runner::CondorRunner;

/// Lifecycle callbacks for a job followed through its user log.
#[async_trait]
pub trait JobListener: Send + Sync {
    async fn queued(&self, event: &CondorEvent);
    async fn running(&self, event: &CondorEvent);
    async fn terminated(&self, job: &CondorJob, event: &CondorEvent);
    async fn failed(&self, event: &CondorEvent);
    async fn aborted(&self, event: &CondorEvent);
}

/// Whether the log tailer should keep following the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Routes events for one job to its listener.
///
/// Grid failures that leave the job held in the queue trigger a single
/// `condor_rm` before the listener sees the failure.
pub struct JobMonitor {
    job: CondorJob,
    listener: Arc<dyn JobListener>,
    runner: Arc<dyn CondorRunner>,
    cancelled: bool,
}

impl JobMonitor {
    pub fn new(job: CondorJob, listener: Arc<dyn JobListener>, runner: Arc<dyn CondorRunner>) -> Self {
        Self {
            job,
            listener,
            runner,
            cancelled: false,
        }
    }

    pub fn job(&self) -> &CondorJob {
        &self.job
    }

    pub async fn dispatch(&mut self, event: &CondorEvent) -> Flow {
        use CondorEventCode::*;

        match event.code {
            GridSubmit | GlobusSubmit => self.listener.queued(event).await,
            Execute => self.listener.running(event).await,
            JobTerminated => {
                self.listener.terminated(&self.job, event).await;
                return Flow::Stop;
            }
            Exception | ShadowException | RemoteError => self.listener.failed(event).await,
            GlobusSubmitFailed | GlobusResourceDown | GridResourceDown | JobHeld => {
                if !self.cancelled {
                    self.cancelled = true;
                    if let Err(e) = self.runner.cancel(&self.job).await {
                        // The job may already be gone when recovering.
                        tracing::warn!(
                            job_id = ?self.job.job_id,
                            error = %e,
                            "Unable to abort failed job"
                        );
                    }
                }
                self.listener.failed(event).await;
            }
            JobAborted => {
                self.listener.aborted(event).await;
                return Flow::Stop;
            }
            other => {
                tracing::debug!(job_id = %event.job_id, code = ?other, "Ignoring Condor event");
            }
        }
        Flow::Continue
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::error::CondorError;

    /// Records callback names in order.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl JobListener for Recorder {
        async fn queued(&self, _event: &CondorEvent) {
            self.push("queued".to_string());
        }
        async fn running(&self, _event: &CondorEvent) {
            self.push("running".to_string());
        }
        async fn terminated(&self, _job: &CondorJob, _event: &CondorEvent) {
            self.push("terminated".to_string());
        }
        async fn failed(&self, event: &CondorEvent) {
            self.push(format!("failed: {}", event.message));
        }
        async fn aborted(&self, _event: &CondorEvent) {
            self.push("aborted".to_string());
        }
    }

    #[derive(Default)]
    pub(crate) struct CountingRunner {
        pub(crate) cancels: AtomicUsize,
    }

    #[async_trait]
    impl CondorRunner for CountingRunner {
        async fn submit(&self, _job: &mut CondorJob) -> Result<(), CondorError> {
            Ok(())
        }
        async fn cancel(&self, _job: &CondorJob) -> Result<(), CondorError> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event(code: CondorEventCode, message: &str) -> CondorEvent {
        CondorEvent {
            code,
            job_id: "7.0".to_string(),
            time: Utc::now(),
            message: message.to_string(),
            details: String::new(),
        }
    }

    fn monitor() -> (JobMonitor, Arc<Recorder>, Arc<CountingRunner>) {
        let recorder = Arc::new(Recorder::default());
        let runner = Arc::new(CountingRunner::default());
        let mut job = CondorJob::new("/tmp/job");
        job.job_id = Some("7.0".to_string());
        (JobMonitor::new(job, recorder.clone(), runner.clone()), recorder, runner)
    }

    #[tokio::test]
    async fn normal_lifecycle() {
        let (mut monitor, recorder, _) = monitor();

        assert_eq!(monitor.dispatch(&event(CondorEventCode::Submit, "")).await, Flow::Continue);
        assert_eq!(monitor.dispatch(&event(CondorEventCode::GridSubmit, "")).await, Flow::Continue);
        assert_eq!(monitor.dispatch(&event(CondorEventCode::Execute, "")).await, Flow::Continue);
        assert_eq!(monitor.dispatch(&event(CondorEventCode::JobTerminated, "")).await, Flow::Stop);

        assert_eq!(recorder.calls(), vec!["queued", "running", "terminated"]);
    }

    #[tokio::test]
    async fn held_job_is_removed_once() {
        let (mut monitor, recorder, runner) = monitor();

        monitor.dispatch(&event(CondorEventCode::JobHeld, "held")).await;
        monitor.dispatch(&event(CondorEventCode::GridResourceDown, "down")).await;
        let flow = monitor.dispatch(&event(CondorEventCode::JobAborted, "")).await;

        assert_eq!(flow, Flow::Stop);
        assert_eq!(runner.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.calls(), vec!["failed: held", "failed: down", "aborted"]);
    }

    #[tokio::test]
    async fn exceptions_are_failures() {
        let (mut monitor, recorder, runner) = monitor();

        monitor.dispatch(&event(CondorEventCode::Exception, "bad log")).await;
        monitor.dispatch(&event(CondorEventCode::RemoteError, "remote")).await;

        assert_eq!(runner.cancels.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.calls(), vec!["failed: bad log", "failed: remote"]);
    }
}
