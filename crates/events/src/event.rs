use std::fmt;

use chrono::Utc;
use corral_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

/// Inputs to the site state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteEventCode {
    Submit,
    InstallSuccess,
    InstallFailed,
    Remove,
    UninstallSuccess,
    UninstallFailed,
    GlideinDeleted,
    Delete,
}

impl SiteEventCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SiteEventCode::Submit => "SUBMIT",
            SiteEventCode::InstallSuccess => "INSTALL_SUCCESS",
            SiteEventCode::InstallFailed => "INSTALL_FAILED",
            SiteEventCode::Remove => "REMOVE",
            SiteEventCode::UninstallSuccess => "UNINSTALL_SUCCESS",
            SiteEventCode::UninstallFailed => "UNINSTALL_FAILED",
            SiteEventCode::GlideinDeleted => "GLIDEIN_DELETED",
            SiteEventCode::Delete => "DELETE",
        }
    }
}

/// Inputs to the glidein state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlideinEventCode {
    Submit,
    Queued,
    SiteReady,
    JobSuccess,
    JobFailure,
    JobAborted,
    Running,
    Remove,
    Delete,
    SiteFailed,
}

impl GlideinEventCode {
    pub fn as_str(self) -> &'static str {
        match self {
            GlideinEventCode::Submit => "SUBMIT",
            GlideinEventCode::Queued => "QUEUED",
            GlideinEventCode::SiteReady => "SITE_READY",
            GlideinEventCode::JobSuccess => "JOB_SUCCESS",
            GlideinEventCode::JobFailure => "JOB_FAILURE",
            GlideinEventCode::JobAborted => "JOB_ABORTED",
            GlideinEventCode::Running => "RUNNING",
            GlideinEventCode::Remove => "REMOVE",
            GlideinEventCode::Delete => "DELETE",
            GlideinEventCode::SiteFailed => "SITE_FAILED",
        }
    }
}

impl fmt::Display for SiteEventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for GlideinEventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An event addressed to one site.
#[derive(Debug, Clone)]
pub struct SiteEvent {
    pub code: SiteEventCode,
    pub time: Timestamp,
    pub site_id: DbId,
    pub message: Option<String>,
    pub long_message: Option<String>,
}

impl SiteEvent {
    pub fn new(code: SiteEventCode, site_id: DbId) -> Self {
        Self {
            code,
            time: Utc::now(),
            site_id,
            message: None,
            long_message: None,
        }
    }

    pub fn with_time(mut self, time: Timestamp) -> Self {
        self.time = time;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_long_message(mut self, long_message: impl Into<String>) -> Self {
        self.long_message = Some(long_message.into());
        self
    }
}

/// An event addressed to one glidein.
#[derive(Debug, Clone)]
pub struct GlideinEvent {
    pub code: GlideinEventCode,
    pub time: Timestamp,
    pub glidein_id: DbId,
    pub message: Option<String>,
    pub long_message: Option<String>,
}

impl GlideinEvent {
    pub fn new(code: GlideinEventCode, glidein_id: DbId) -> Self {
        Self {
            code,
            time: Utc::now(),
            glidein_id,
            message: None,
            long_message: None,
        }
    }

    pub fn with_time(mut self, time: Timestamp) -> Self {
        self.time = time;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_long_message(mut self, long_message: impl Into<String>) -> Self {
        self.long_message = Some(long_message.into());
        self
    }
}

/// Anything that can be put on the [`EventQueue`](crate::EventQueue).
#[derive(Debug, Clone)]
pub enum Event {
    Site(SiteEvent),
    Glidein(GlideinEvent),
}

impl Event {
    pub fn time(&self) -> Timestamp {
        match self {
            Event::Site(e) => e.time,
            Event::Glidein(e) => e.time,
        }
    }
}

impl From<SiteEvent> for Event {
    fn from(event: SiteEvent) -> Self {
        Event::Site(event)
    }
}

impl From<GlideinEvent> for Event {
    fn from(event: GlideinEvent) -> Self {
        Event::Glidein(event)
    }
}
