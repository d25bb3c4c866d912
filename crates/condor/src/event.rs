//! Condor user-log events and the log entry parser.

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use corral_core::error::error_chain;
use corral_core::types::Timestamp;

use crate::error::CondorError;

/// Event codes written to the Condor user log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondorEventCode {
    Submit,
    Execute,
    ExecutableError,
    Checkpointed,
    JobEvicted,
    JobTerminated,
    ImageSize,
    ShadowException,
    Generic,
    JobAborted,
    JobSuspended,
    JobUnsuspended,
    JobHeld,
    JobReleased,
    NodeExecute,
    NodeTerminated,
    PostScriptTerminated,
    GlobusSubmit,
    GlobusSubmitFailed,
    GlobusResourceUp,
    GlobusResourceDown,
    RemoteError,
    JobDisconnected,
    JobReconnected,
    JobReconnectFailed,
    GridResourceUp,
    GridResourceDown,
    GridSubmit,
    JobAdInformation,
    /// Synthesized when the log cannot be read or parsed.
    Exception,
}

impl CondorEventCode {
    const TABLE: &'static [(i32, CondorEventCode, &'static str)] = &[
        (0, CondorEventCode::Submit, "Job submitted"),
        (1, CondorEventCode::Execute, "Job now running"),
        (2, CondorEventCode::ExecutableError, "Error in executable"),
        (3, CondorEventCode::Checkpointed, "Job was checkpointed"),
        (4, CondorEventCode::JobEvicted, "Job evicted from machine"),
        (5, CondorEventCode::JobTerminated, "Job terminated"),
        (6, CondorEventCode::ImageSize, "Image size of job updated"),
        (7, CondorEventCode::ShadowException, "Shadow threw an exception"),
        (8, CondorEventCode::Generic, "Generic Log Event"),
        (9, CondorEventCode::JobAborted, "Job Aborted"),
        (10, CondorEventCode::JobSuspended, "Job was suspended"),
        (11, CondorEventCode::JobUnsuspended, "Job was unsuspended"),
        (12, CondorEventCode::JobHeld, "Job was held"),
        (13, CondorEventCode::JobReleased, "Job was released"),
        (14, CondorEventCode::NodeExecute, "Parallel Node executed"),
        (15, CondorEventCode::NodeTerminated, "Parallel Node terminated"),
        (16, CondorEventCode::PostScriptTerminated, "POST script terminated"),
        (17, CondorEventCode::GlobusSubmit, "Job Submitted to Globus"),
        (18, CondorEventCode::GlobusSubmitFailed, "Globus Submit failed"),
        (19, CondorEventCode::GlobusResourceUp, "Globus Resource Up"),
        (20, CondorEventCode::GlobusResourceDown, "Globus Resource Down"),
        (21, CondorEventCode::RemoteError, "Remote Error"),
        (22, CondorEventCode::JobDisconnected, "RSC socket lost"),
        (23, CondorEventCode::JobReconnected, "RSC socket re-established"),
        (24, CondorEventCode::JobReconnectFailed, "RSC reconnect failure"),
        (25, CondorEventCode::GridResourceUp, "Grid Resource Up"),
        (26, CondorEventCode::GridResourceDown, "Grid Resource Down"),
        (27, CondorEventCode::GridSubmit, "Job Submitted remotely"),
        (28, CondorEventCode::JobAdInformation, "Report job ad information"),
        (999, CondorEventCode::Exception, "Log parser threw an exception"),
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(_, event, _)| *event)
    }

    pub fn code(self) -> i32 {
        self.entry().0
    }

    pub fn description(self) -> &'static str {
        self.entry().2
    }

    fn entry(self) -> &'static (i32, CondorEventCode, &'static str) {
        Self::TABLE
            .iter()
            .find(|(_, event, _)| *event == self)
            .unwrap_or(&Self::TABLE[Self::TABLE.len() - 1])
    }
}

/// One entry from a job's user log.
#[derive(Debug, Clone)]
pub struct CondorEvent {
    pub code: CondorEventCode,
    pub job_id: String,
    pub time: Timestamp,
    pub message: String,
    /// The raw log entry, or the error chain for exceptions.
    pub details: String,
}

impl CondorEvent {
    /// Synthesize an `EXCEPTION` event for a failure while following the log.
    pub fn exception(job_id: &str, err: &CondorError) -> Self {
        Self {
            code: CondorEventCode::Exception,
            job_id: job_id.to_string(),
            time: Utc::now(),
            message: err.to_string(),
            details: error_chain(err),
        }
    }
}

/// Parse one log entry. `lines` holds the header line first and the
/// terminating `...` line last, without line feeds.
///
/// The log records `MM/DD HH:MM:SS` in local time; `year` supplies the rest.
pub fn parse_event(
    lines: &[String],
    expected_job_id: &str,
    year: i32,
) -> Result<CondorEvent, CondorError> {
    let header = lines
        .first()
        .ok_or_else(|| CondorError::Parse("Empty event".to_string()))?;

    let fields: Vec<&str> = header.splitn(5, ' ').collect();
    if fields.len() != 5 {
        return Err(CondorError::Parse(format!(
            "Error parsing event header: {header}"
        )));
    }

    let code = fields[0]
        .parse::<i32>()
        .ok()
        .and_then(CondorEventCode::from_code)
        .ok_or_else(|| CondorError::Parse(format!("Unrecognized event code: {}", fields[0])))?;

    let job_id = parse_job_id(fields[1])?;
    if job_id != expected_job_id {
        return Err(CondorError::Parse(format!(
            "Condor ID mismatch: got {job_id} expected {expected_job_id}"
        )));
    }

    let stamp = format!("{year}/{} {}", fields[2], fields[3]);
    let time = NaiveDateTime::parse_from_str(&stamp, "%Y/%m/%d %H:%M:%S")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            CondorError::Parse(format!(
                "Error parsing event time: {} {}",
                fields[2], fields[3]
            ))
        })?;

    let mut details = String::new();
    for line in lines {
        details.push_str(line);
        details.push('\n');
    }

    Ok(CondorEvent {
        code,
        job_id,
        time,
        message: fields[4].trim().to_string(),
        details,
    })
}

/// `(123.000.000)` becomes `123.0`.
fn parse_job_id(field: &str) -> Result<String, CondorError> {
    let err = || CondorError::Parse(format!("Error parsing job id: {field}"));
    let inner = field
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(err)?;
    let tokens: Vec<&str> = inner.split('.').collect();
    if tokens.len() != 3 {
        return Err(err());
    }
    let cluster: u64 = tokens[0].parse().map_err(|_| err())?;
    let proc_id: u64 = tokens[1].parse().map_err(|_| err())?;
    tokens[2].parse::<u64>().map_err(|_| err())?;
    Ok(format!("{cluster}.{proc_id}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
