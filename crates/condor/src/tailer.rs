//! Following a job's Condor user log.
//!
//! [`EventGenerator`] polls the log from its last read offset and yields
//! complete entries; [`watch`] builds the task that feeds it to a
//! [`JobMonitor`] until the job ends or the token is cancelled.

use std::future::Future;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, Local};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

use crate::error::CondorError;
use crate::event::{parse_event, CondorEvent};
use crate::listener::{Flow, JobMonitor};

/// Default interval between log polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Incremental reader of a Condor user log.
#[derive(Debug)]
pub struct EventGenerator {
    log: PathBuf,
    job_id: String,
    offset: u64,
    partial: Vec<u8>,
    current: Vec<String>,
}

impl EventGenerator {
    pub fn new(log: impl Into<PathBuf>, job_id: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            job_id: job_id.into(),
            offset: 0,
            partial: Vec::new(),
            current: Vec::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Read whatever was appended since the last poll and return the
    /// entries it completed. A log that does not exist yet reads as empty.
    pub async fn poll(&mut self) -> Result<Vec<CondorEvent>, CondorError> {
        let len = match tokio::fs::metadata(&self.log).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(CondorError::io("Unable to read job log", e)),
        };

        if len < self.offset {
            // Truncated
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = tokio::fs::File::open(&self.log)
            .await
            .map_err(|e| CondorError::io("Unable to read job log", e))?;
        file.seek(SeekFrom::Start(self.offset))
            .await
            .map_err(|e| CondorError::io("Unable to read job log", e))?;
        let mut data = Vec::new();
        let read = file
            .read_to_end(&mut data)
            .await
            .map_err(|e| CondorError::io("Unable to read job log", e))?;
        self.offset += read as u64;

        self.consume(&data)
    }

    fn consume(&mut self, data: &[u8]) -> Result<Vec<CondorEvent>, CondorError> {
        let year = Local::now().year();
        let mut events = Vec::new();

        for &byte in data {
            if byte != b'\n' {
                self.partial.push(byte);
                continue;
            }
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();

            let end_of_event = line.starts_with("...");
            self.current.push(line);
            if end_of_event {
                let lines = std::mem::take(&mut self.current);
                events.push(parse_event(&lines, &self.job_id, year)?);
            }
        }
        Ok(events)
    }
}

/// Follow the monitor's job until it stops listening or `cancel` fires.
///
/// The returned future is meant to be spawned by the caller. Each entry is
/// dispatched in log order. A read or parse failure is delivered as an
/// `EXCEPTION` event and ends the watch.
pub fn watch(
    mut monitor: JobMonitor,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<impl Future<Output = ()> + Send + 'static, CondorError> {
    let job_id = monitor.job().job_id.clone().ok_or(CondorError::NotSubmitted)?;
    let mut generator = EventGenerator::new(monitor.job().log_path(), job_id);

    Ok(async move {
        tracing::debug!(job_id = %generator.job_id(), "Following Condor job log");
        loop {
            match generator.poll().await {
                Ok(events) => {
                    for event in &events {
                        if monitor.dispatch(event).await == Flow::Stop {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(job_id = %generator.job_id(), error = %e, "Condor log failure");
                    let event = CondorEvent::exception(generator.job_id(), &e);
                    monitor.dispatch(&event).await;
                    return;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(job_id = %generator.job_id(), "Log watch cancelled");
                    return;
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::event::CondorEventCode;
    use crate::job::CondorJob;
    use crate::listener::tests::{CountingRunner, Recorder};

    const SUBMIT: &str = "000 (012.000.000) 06/02 10:15:30 Job submitted from host: <10.0.0.1:9618>\n...\n";
    const GRID_SUBMIT: &str = "027 (012.000.000) 06/02 10:16:00 Job submitted to grid resource\n    GridResource: gt2 gatekeeper.example.edu/jobmanager-fork\n...\n";
    const EXECUTE: &str = "001 (012.000.000) 06/02 10:20:00 Job executing on host: gt2 gatekeeper.example.edu\n...\n";
    const TERMINATED: &str = "005 (012.000.000) 06/02 11:20:00 Job terminated.\n\t(1) Normal termination (return value 0)\n...\n";

    #[tokio::test]
    async fn missing_log_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator = EventGenerator::new(dir.path().join("log"), "12.0");
        assert!(generator.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_incrementally_across_partial_entries() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        let mut generator = EventGenerator::new(&log, "12.0");

        let (head, tail) = GRID_SUBMIT.split_at(20);
        tokio::fs::write(&log, format!("{SUBMIT}{head}")).await.unwrap();
        let events = generator.poll().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code, CondorEventCode::Submit);

        tokio::fs::write(&log, format!("{SUBMIT}{head}{tail}{EXECUTE}")).await.unwrap();
        let events = generator.poll().await.unwrap();
        let codes: Vec<_> = events.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![CondorEventCode::GridSubmit, CondorEventCode::Execute]);
        assert!(events[0].details.contains("GridResource: gt2"));
    }

    #[tokio::test]
    async fn truncated_log_is_reread() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        let mut generator = EventGenerator::new(&log, "12.0");

        tokio::fs::write(&log, format!("{SUBMIT}{GRID_SUBMIT}")).await.unwrap();
        assert_eq!(generator.poll().await.unwrap().len(), 2);

        tokio::fs::write(&log, EXECUTE).await.unwrap();
        let events = generator.poll().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code, CondorEventCode::Execute);
    }

    #[tokio::test]
    async fn foreign_job_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        tokio::fs::write(&log, SUBMIT).await.unwrap();

        let mut generator = EventGenerator::new(&log, "13.0");
        let err = generator.poll().await.unwrap_err();
        assert_eq!(err.to_string(), "Condor ID mismatch: got 12.0 expected 13.0");
    }

    #[tokio::test]
    async fn watch_stops_after_termination() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = CondorJob::new(dir.path());
        job.job_id = Some("12.0".to_string());
        tokio::fs::write(job.log_path(), format!("{SUBMIT}{GRID_SUBMIT}{EXECUTE}{TERMINATED}"))
            .await
            .unwrap();

        let recorder = Arc::new(Recorder::default());
        let monitor = JobMonitor::new(job, recorder.clone(), Arc::new(CountingRunner::default()));
        watch(monitor, Duration::from_millis(10), CancellationToken::new())
            .unwrap()
            .await;

        assert_eq!(recorder.calls(), vec!["queued", "running", "terminated"]);
    }

    #[tokio::test]
    async fn watch_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = CondorJob::new(dir.path());
        job.job_id = Some("12.0".to_string());
        tokio::fs::write(job.log_path(), "garbage\n...\n").await.unwrap();

        let recorder = Arc::new(Recorder::default());
        let monitor = JobMonitor::new(job, recorder.clone(), Arc::new(CountingRunner::default()));
        watch(monitor, Duration::from_millis(10), CancellationToken::new())
            .unwrap()
            .await;

        assert_eq!(recorder.calls(), vec!["failed: Error parsing event header: garbage"]);
    }

    #[tokio::test]
    async fn watch_ends_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = CondorJob::new(dir.path());
        job.job_id = Some("12.0".to_string());

        let cancel = CancellationToken::new();
        let recorder = Arc::new(Recorder::default());
        let monitor = JobMonitor::new(job, recorder.clone(), Arc::new(CountingRunner::default()));
        let handle = tokio::spawn(watch(monitor, Duration::from_secs(60), cancel.clone()).unwrap());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn watch_requires_submitted_job() {
        let monitor = JobMonitor::new(
            CondorJob::new("/tmp/job"),
            Arc::new(Recorder::default()),
            Arc::new(CountingRunner::default()),
        );
        assert!(watch(monitor, DEFAULT_POLL_INTERVAL, CancellationToken::new()).is_err());
    }
}
