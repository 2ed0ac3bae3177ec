//! Client-local persistence of the bearer credential across process restarts.
//! The cache is read once at bootstrap; a missing or unreadable file means "no
//! prior session". Files are written owner-only on Unix.

use super::types::{Credential, StoredCredential};
use crate::error::ServiceError;
use std::{io::ErrorKind, path::PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Default cache location below the user's home directory.
pub const DEFAULT_RELATIVE_PATH: &str = ".totc/credentials.json";

#[derive(Clone, Debug)]
pub struct CredentialCache {
    path: PathBuf,
}

impl CredentialCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.totc/credentials.json`, or a relative path when `HOME` is unset.
    #[must_use]
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map_or_else(
                || PathBuf::from(DEFAULT_RELATIVE_PATH),
                |home| home.join(DEFAULT_RELATIVE_PATH),
            )
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub async fn load(&self) -> Option<Credential> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached credential");
                return None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), "failed to read cached credential: {err}");
                return None;
            }
        };

        match serde_json::from_slice::<StoredCredential>(&raw) {
            Ok(stored) => Some(stored.into()),
            Err(err) => {
                warn!(path = %self.path.display(), "ignoring unreadable cached credential: {err}");
                None
            }
        }
    }

    /// # Errors
    /// Returns `ServiceError::Storage` if the file cannot be written.
    pub async fn store(&self, credential: &Credential) -> Result<(), ServiceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| storage_error("create credential directory", &err))?;
            }
        }

        let payload = serde_json::to_vec(&StoredCredential::from(credential))
            .map_err(|err| ServiceError::Storage(format!("encode credential: {err}")))?;

        // Written to a private sibling first so the credential file never
        // exists with default permissions.
        let staging = self.staging_path();
        match tokio::fs::remove_file(&staging).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(storage_error("remove stale credential file", &err)),
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let written = async {
            let mut file = options.open(&staging).await?;
            file.write_all(&payload).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&staging, &self.path).await
        }
        .await;

        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(storage_error("write credential", &err));
        }

        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Removes the cached credential; a missing file is not an error.
    ///
    /// # Errors
    /// Returns `ServiceError::Storage` if an existing file cannot be removed.
    pub async fn clear(&self) -> Result<(), ServiceError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error("remove credential", &err)),
        }
    }
}

fn storage_error(action: &str, err: &std::io::Error) -> ServiceError {
    ServiceError::Storage(format!("{action}: {err}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::{ExposeSecret, SecretString};

    fn credential() -> Credential {
        Credential {
            access_token: SecretString::from("access".to_string()),
            refresh_token: SecretString::from("refresh".to_string()),
            expires_at: 1_900_000_000,
        }
    }

    #[tokio::test]
    async fn store_then_load_returns_same_credential() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("nested/credentials.json"));

        cache.store(&credential()).await.unwrap();
        let loaded = cache.load().await.unwrap();

        assert_eq!(loaded.access_token.expose_secret(), "access");
        assert_eq!(loaded.refresh_token.expose_secret(), "refresh");
        assert_eq!(loaded.expires_at, 1_900_000_000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stored_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("credentials.json"));
        cache.store(&credential()).await.unwrap();

        let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn store_replaces_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("credentials.json"));
        std::fs::write(cache.path(), b"{}").unwrap();
        std::fs::set_permissions(cache.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        // Leftover staging file from an interrupted write.
        std::fs::write(dir.path().join("credentials.json.tmp"), b"stale").unwrap();
        std::fs::set_permissions(
            dir.path().join("credentials.json.tmp"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        cache.store(&credential()).await.unwrap();

        let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join("credentials.json.tmp").exists());
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded.access_token.expose_secret(), "access");
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_means_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("credentials.json"));
        assert!(cache.load().await.is_none());

        std::fs::write(cache.path(), b"{not json").unwrap();
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CredentialCache::new(dir.path().join("credentials.json"));
        cache.store(&credential()).await.unwrap();

        cache.clear().await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.load().await.is_none());
    }
}
