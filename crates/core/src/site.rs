//! Site domain types and creation rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::state::{ServiceType, SiteState};
use crate::types::{DbId, Timestamp};

/// A Globus gatekeeper used either to stage software or to run glideins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionService {
    pub service_type: ServiceType,
    pub service_contact: String,
    pub project: Option<String>,
    pub queue: Option<String>,
}

/// An environment variable passed to every job submitted for a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub variable: String,
    pub value: String,
}

/// Execution service as supplied by a client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionServiceSpec {
    pub service_type: Option<ServiceType>,
    pub service_contact: Option<String>,
    pub project: Option<String>,
    pub queue: Option<String>,
}

/// Request body for creating a site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSite {
    pub name: Option<String>,
    pub install_path: Option<String>,
    pub local_path: Option<String>,
    pub staging_service: Option<ExecutionServiceSpec>,
    pub glidein_service: Option<ExecutionServiceSpec>,
    pub condor_version: Option<String>,
    pub condor_package: Option<String>,
    #[serde(default)]
    pub environment: Vec<EnvironmentVariable>,
}

/// A validated site that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub install_path: String,
    pub local_path: String,
    pub staging_service: ExecutionService,
    pub glidein_service: ExecutionService,
    pub condor_version: Option<String>,
    pub condor_package: Option<String>,
    pub environment: Vec<EnvironmentVariable>,
    pub subject: String,
    pub local_username: String,
    pub created: Timestamp,
}

/// A persisted site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: DbId,
    pub name: String,
    pub install_path: String,
    pub local_path: String,
    pub staging_service: ExecutionService,
    pub glidein_service: ExecutionService,
    pub condor_version: Option<String>,
    pub condor_package: Option<String>,
    pub environment: Vec<EnvironmentVariable>,
    pub state: SiteState,
    pub short_message: String,
    pub long_message: Option<String>,
    pub created: Timestamp,
    pub last_update: Timestamp,
    pub subject: String,
    pub local_username: String,
}

impl Site {
    pub fn is_owned_by(&self, subject: &str) -> bool {
        self.subject == subject
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, CoreError> {
    value.ok_or_else(|| CoreError::Validation(message.to_string()))
}

fn validate_service(
    spec: Option<ExecutionServiceSpec>,
    label: &str,
) -> Result<ExecutionService, CoreError> {
    let spec =
        spec.ok_or_else(|| CoreError::Validation(format!("Must provide {label} service")))?;
    match (spec.service_type, spec.service_contact) {
        (Some(service_type), Some(service_contact)) => Ok(ExecutionService {
            service_type,
            service_contact,
            project: spec.project,
            queue: spec.queue,
        }),
        _ => Err(CoreError::Validation(format!(
            "Invalid {label} service: must specify service contact and service type"
        ))),
    }
}

/// Validate a create request and attach the owner.
///
/// Checks run in a fixed order so the first missing field is reported.
pub fn validate_new_site(
    req: CreateSite,
    subject: &str,
    local_username: &str,
    now: Timestamp,
) -> Result<NewSite, CoreError> {
    let name = required(req.name, "Site must have name")?;
    let staging_service = validate_service(req.staging_service, "staging")?;
    let glidein_service = validate_service(req.glidein_service, "glidein")?;

    if req.condor_package.is_none() && req.condor_version.is_none() {
        return Err(CoreError::Validation(
            "Must specify condor package OR condor version".to_string(),
        ));
    }

    let install_path = required(req.install_path, "Must specify install path")?;
    let local_path = required(req.local_path, "Must specify local path")?;

    Ok(NewSite {
        name,
        install_path,
        local_path,
        staging_service,
        glidein_service,
        condor_version: req.condor_version,
        condor_package: req.condor_package,
        environment: req.environment,
        subject: subject.to_string(),
        local_username: local_username.to_string(),
        created: now,
    })
}
