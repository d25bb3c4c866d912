use corral_core::error::CoreError;
use corral_core::glidein::Glidein;
use corral_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `glideins` table.
#[derive(Debug, Clone, FromRow)]
pub struct GlideinRow {
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
    pub state: String,
    pub short_message: String,
    pub long_message: Option<String>,
    pub created: Timestamp,
    pub last_update: Timestamp,
    pub submits: i32,
    pub subject: String,
    pub local_username: String,
}

impl TryFrom<GlideinRow> for Glidein {
    type Error = CoreError;

    fn try_from(row: GlideinRow) -> Result<Self, Self::Error> {
        Ok(Glidein {
            id: row.id,
            site_id: row.site_id,
            site_name: row.site_name,
            condor_host: row.condor_host,
            count: row.count,
            host_count: row.host_count,
            wall_time: row.wall_time,
            num_cpus: row.num_cpus,
            condor_config: row.condor_config,
            gcb_broker: row.gcb_broker,
            highport: row.highport,
            lowport: row.lowport,
            ccb_address: row.ccb_address,
            idle_time: row.idle_time,
            condor_debug: row.condor_debug,
            resubmit: row.resubmit,
            until: row.until,
            resubmits: row.resubmits,
            rsl: row.rsl,
            state: row.state.parse()?,
            short_message: row.short_message,
            long_message: row.long_message,
            created: row.created,
            last_update: row.last_update,
            submits: row.submits,
            subject: row.subject,
            local_username: row.local_username,
        })
    }
}
