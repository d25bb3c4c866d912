use corral_core::error::CoreError;
use corral_core::site::{EnvironmentVariable, ExecutionService, Site};
use corral_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `sites` table.
#[derive(Debug, Clone, FromRow)]
pub struct SiteRow {
    pub id: DbId,
    pub name: String,
    pub install_path: String,
    pub local_path: String,
    pub staging_service_type: String,
    pub staging_service_contact: String,
    pub staging_service_project: Option<String>,
    pub staging_service_queue: Option<String>,
    pub glidein_service_type: String,
    pub glidein_service_contact: String,
    pub glidein_service_project: Option<String>,
    pub glidein_service_queue: Option<String>,
    pub condor_version: Option<String>,
    pub condor_package: Option<String>,
    pub environment: Json<Vec<EnvironmentVariable>>,
    pub state: String,
    pub short_message: String,
    pub long_message: Option<String>,
    pub created: Timestamp,
    pub last_update: Timestamp,
    pub subject: String,
    pub local_username: String,
}

impl TryFrom<SiteRow> for Site {
    type Error = CoreError;

    fn try_from(row: SiteRow) -> Result<Self, Self::Error> {
        Ok(Site {
            id: row.id,
            name: row.name,
            install_path: row.install_path,
            local_path: row.local_path,
            staging_service: ExecutionService {
                service_type: row.staging_service_type.parse()?,
                service_contact: row.staging_service_contact,
                project: row.staging_service_project,
                queue: row.staging_service_queue,
            },
            glidein_service: ExecutionService {
                service_type: row.glidein_service_type.parse()?,
                service_contact: row.glidein_service_contact,
                project: row.glidein_service_project,
                queue: row.glidein_service_queue,
            },
            condor_version: row.condor_version,
            condor_package: row.condor_package,
            environment: row.environment.0,
            state: row.state.parse()?,
            short_message: row.short_message,
            long_message: row.long_message,
            created: row.created,
            last_update: row.last_update,
            subject: row.subject,
            local_username: row.local_username,
        })
    }
}
