//! State change history of sites and glideins.
//!
//! One entry is recorded when a resource is created and one for every state
//! change after that. Entries outlive the resource, so the history of a
//! deleted site or glidein can still be read.

use serde::{Deserialize, Serialize};

use crate::state::{GlideinState, SiteState};
use crate::types::{DbId, Timestamp};

/// A resource entered `state` at `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry<S> {
    pub id: DbId,
    pub state: S,
    pub time: Timestamp,
}

pub type SiteHistoryEntry = HistoryEntry<SiteState>;
pub type GlideinHistoryEntry = HistoryEntry<GlideinState>;
