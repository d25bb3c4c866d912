//! Delegated grid proxy credential.
//!
//! The proxy is carried as opaque PEM text. Its expiry is declared by the
//! client that delegated it and is what lifetime checks are made against.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Seconds of lifetime an install or uninstall job needs.
pub const SITE_JOB_MIN_LIFETIME_SECS: i64 = 300;

#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub pem: String,
    pub expires_at: Timestamp,
}

impl Credential {
    /// Remaining lifetime in seconds (negative once expired).
    pub fn time_left(&self, now: Timestamp) -> i64 {
        (self.expires_at - now).num_seconds()
    }

    /// Whether the credential outlives `needed_secs` from `now`.
    pub fn covers(&self, needed_secs: i64, now: Timestamp) -> bool {
        needed_secs < self.time_left(now)
    }
}

// Keep proxy material out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("pem", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
