//! Shared response envelope for API handlers.

use corral_core::types::DbId;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Body of a successful create.
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: DbId,
}
