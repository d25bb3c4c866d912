//! Reading the user's proxy for delegation.
//!
//! The proxy file is sent as-is; its lifetime is whatever the user declares
//! with `--credential-lifetime`.

use std::path::Path;

use anyhow::Context;
use chrono::{Duration, Utc};
use corral_core::credential::Credential;

pub const DEFAULT_LIFETIME_HOURS: i64 = 12;

pub fn load(path: &Path, lifetime_hours: i64) -> anyhow::Result<Credential> {
    if lifetime_hours <= 0 {
        anyhow::bail!("Credential lifetime must be positive");
    }
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read proxy credential: {}", path.display()))?;
    if !pem.contains("-----BEGIN") {
        anyhow::bail!("Unable to read proxy credential: {}: not a PEM file", path.display());
    }
    Ok(Credential {
        pem,
        expires_at: Utc::now() + Duration::hours(lifetime_hours),
    })
}
