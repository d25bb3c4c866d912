use std::str::FromStr;

use corral_core::error::CoreError;
use corral_core::history::HistoryEntry;
use corral_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `site_history` or `glidein_history`, with the resource id
/// selected as `id`.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: DbId,
    pub state: String,
    pub time: Timestamp,
}

impl HistoryRow {
    pub fn into_entry<S>(self) -> Result<HistoryEntry<S>, CoreError>
    where
        S: FromStr<Err = CoreError>,
    {
        Ok(HistoryEntry {
            id: self.id,
            state: self.state.parse()?,
            time: self.time,
        })
    }
}
