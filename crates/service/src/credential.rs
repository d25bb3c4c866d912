//! On-disk storage for delegated credentials.
//!
//! A resource's credential is kept as JSON (PEM plus declared expiry) in its
//! working directory. Jobs get the bare PEM copied into their job directory
//! for Condor's `x509userproxy`. Both files are created with mode 0600.

use std::path::Path;

use corral_core::credential::Credential;
use tokio::io::AsyncWriteExt;

use crate::error::{ResultExt, ServiceError};

async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;
    file.write_all(contents).await?;
    file.flush().await
}

/// Save `credential` at `path`, replacing any previous one.
pub async fn store(path: &Path, credential: &Credential) -> Result<(), ServiceError> {
    let json = serde_json::to_vec(credential).context("Unable to store credential")?;
    write_private(path, &json)
        .await
        .context("Unable to store credential")
}

/// Load a credential saved by [`store`].
pub async fn load(path: &Path) -> Result<Credential, ServiceError> {
    let data = tokio::fs::read(path).await.context("Unable to load credential")?;
    serde_json::from_slice(&data).context("Unable to load credential")
}

/// Write the bare PEM proxy for a job.
pub async fn write_proxy(path: &Path, credential: &Credential) -> Result<(), ServiceError> {
    write_private(path, credential.pem.as_bytes())
        .await
        .context("Unable to save credential")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn credential() -> Credential {
        Credential {
            pem: "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n".to_string(),
            expires_at: Utc::now() + Duration::hours(12),
        }
    }

    #[tokio::test]
    async fn store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credential");
        let cred = credential();

        store(&path, &cred).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded.pem, cred.pem);
        assert_eq!(loaded.expires_at, cred.expires_at);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stored = dir.path().join("credential");
        let proxy = dir.path().join("proxy");
        store(&stored, &credential()).await.unwrap();
        write_proxy(&proxy, &credential()).await.unwrap();

        for path in [stored, proxy] {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn missing_credential_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("credential")).await.unwrap_err();
        assert_eq!(err.to_string(), "Unable to load credential");
    }
}
