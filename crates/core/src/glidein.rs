//! Glidein domain types, creation rules and the resubmission policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::state::{GlideinState, SiteState};
use crate::types::{DbId, Timestamp};

/// Minimum wall time in minutes. One minute is subtracted when the job is
/// submitted so the glidein can shut down before the local scheduler kills it.
pub const MIN_WALL_TIME: i32 = 2;

fn one() -> i32 {
    1
}

fn default_wall_time() -> i32 {
    60
}

/// Request body for creating a glidein.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGlidein {
    pub site_id: DbId,
    pub condor_host: String,
    #[serde(default = "one")]
    pub count: i32,
    #[serde(default = "one")]
    pub host_count: i32,
    #[serde(default = "default_wall_time")]
    pub wall_time: i32,
    #[serde(default = "one")]
    pub num_cpus: i32,
    pub condor_config: Option<String>,
    pub gcb_broker: Option<String>,
    pub highport: Option<i32>,
    pub lowport: Option<i32>,
    pub ccb_address: Option<String>,
    pub idle_time: Option<i32>,
    pub condor_debug: Option<String>,
    #[serde(default)]
    pub resubmit: bool,
    pub until: Option<Timestamp>,
    pub resubmits: Option<i32>,
    pub rsl: Option<String>,
}

impl CreateGlidein {
    /// A request with the documented defaults for everything optional.
    pub fn new(site_id: DbId, condor_host: impl Into<String>) -> Self {
        Self {
            site_id,
            condor_host: condor_host.into(),
            count: 1,
            host_count: 1,
            wall_time: default_wall_time(),
            num_cpus: 1,
            condor_config: None,
            gcb_broker: None,
            highport: None,
            lowport: None,
            ccb_address: None,
            idle_time: None,
            condor_debug: None,
            resubmit: false,
            until: None,
            resubmits: None,
            rsl: None,
        }
    }
}

/// A validated glidein that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewGlidein {
    pub request: CreateGlidein,
    pub site_name: String,
    pub subject: String,
    pub local_username: String,
    pub created: Timestamp,
}

/// A persisted glidein.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Glidein {
    pub id: DbId,
    pub site_id: DbId,
    pub site_name: String,
    pub condor_host: String,
    pub count: i32,
    pub host_count: i32,
    pub wall_time: i32,
    pub num_cpus: i32,
    pub condor_config: Option<String>,
    pub gcb_broker: Option<String>,
    pub highport: Option<i32>,
    pub lowport: Option<i32>,
    pub ccb_address: Option<String>,
    pub idle_time: Option<i32>,
    pub condor_debug: Option<String>,
    pub resubmit: bool,
    pub until: Option<Timestamp>,
    pub resubmits: Option<i32>,
    pub rsl: Option<String>,
    pub state: GlideinState,
    pub short_message: String,
    pub long_message: Option<String>,
    pub created: Timestamp,
    pub last_update: Timestamp,
    pub submits: i32,
    pub subject: String,
    pub local_username: String,
}

impl Glidein {
    pub fn is_owned_by(&self, subject: &str) -> bool {
        self.subject == subject
    }

    /// Number of Condor slots this glidein provides.
    pub fn slots(&self) -> i32 {
        self.count * self.num_cpus
    }

    /// Whether a finished glidein job should be submitted again.
    pub fn should_resubmit(&self, now: Timestamp) -> bool {
        should_resubmit(self.resubmit, self.resubmits, self.submits, self.until, now)
    }
}

/// Validate a create request and attach the owner. The site name is filled
/// in later, when the site is locked and checked.
pub fn validate_new_glidein(
    req: CreateGlidein,
    subject: &str,
    local_username: &str,
    now: Timestamp,
) -> Result<NewGlidein, CoreError> {
    if req.wall_time < MIN_WALL_TIME {
        return Err(CoreError::Validation(format!(
            "Wall time must be >= {MIN_WALL_TIME} minutes"
        )));
    }
    Ok(NewGlidein {
        request: req,
        site_name: String::new(),
        subject: subject.to_string(),
        local_username: local_username.to_string(),
        created: now,
    })
}

/// Reject glidein creation for sites that are going away or broken.
pub fn ensure_site_accepts_glideins(state: SiteState) -> Result<(), CoreError> {
    match state {
        SiteState::Failed | SiteState::Exiting | SiteState::Removing => Err(
            CoreError::Conflict(format!("Site cannot be in {state} when creating a glidein")),
        ),
        _ => Ok(()),
    }
}

/// Resubmission policy.
///
/// - `resubmit == false`: never.
/// - `resubmits > 0`: while the number of submits so far is `<= resubmits`.
/// - `until` set: while `until` is in the future.
/// - otherwise: always.
pub fn should_resubmit(
    resubmit: bool,
    resubmits: Option<i32>,
    submits: i32,
    until: Option<Timestamp>,
    now: Timestamp,
) -> bool {
    if !resubmit {
        return false;
    }
    if let Some(max) = resubmits.filter(|n| *n > 0) {
        return submits <= max;
    }
    if let Some(until) = until {
        return until > now;
    }
    true
}
