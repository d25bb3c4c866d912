//! Condor integration for the provisioning service.
//!
//! Builds grid-universe job descriptions and submit scripts, runs
//! `condor_submit`/`condor_rm`, and follows a job through its Condor user
//! log, turning log entries into listener callbacks.

pub mod error;
pub mod event;
pub mod job;
pub mod listener;
pub mod runner;
pub mod tailer;

pub use error::CondorError;
pub use event::{CondorEvent, CondorEventCode};
pub use job::{CondorGridType, CondorJob, CondorUniverse, XattrValue};
pub use listener::{Flow, JobListener, JobMonitor};
pub use runner::{CondorCli, CondorRunner};
pub use tailer::{watch, EventGenerator, DEFAULT_POLL_INTERVAL};
