//! File-backed cache for the single credential.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::credential::Credential;
use crate::error::{PersistError, TokenLoadError};

/// Default token file name, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Loads and persists one [`Credential`] as JSON.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached credential.
    ///
    /// A missing file and a file that does not parse are both reported as
    /// errors the caller is expected to treat as a cache miss.
    pub fn load(&self) -> Result<Credential, TokenLoadError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TokenLoadError::NotFound {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(TokenLoadError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&data).map_err(|source| TokenLoadError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Freshness check used before reusing a cached credential.
    pub fn is_valid(credential: &Credential, now: DateTime<Utc>) -> bool {
        credential.is_valid_at(now)
    }

    /// Write `credential`, replacing any previous file atomically.
    ///
    /// The record goes to a sibling temp file first and is renamed into
    /// place, so a crash never leaves a half-written token behind.
    pub fn save(&self, credential: &Credential) -> Result<(), PersistError> {
        let data = serde_json::to_vec_pretty(credential)?;
        let tmp = self.temp_path();

        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let result = (|| {
            let mut file = open_private(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
            std::fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(e));
        }

        debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_TOKEN_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn sample(expiry: DateTime<Utc>) -> Credential {
        Credential {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry,
        }
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(matches!(store.load(), Err(TokenLoadError::NotFound { .. })));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = TokenStore::new(&path);
        assert!(matches!(store.load(), Err(TokenLoadError::Malformed { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("token.json"));
        let cred = sample(Utc::now() + Duration::seconds(3600));

        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), cred);
        assert!(!dir.path().join("nested").join("token.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        store.save(&sample(Utc::now())).unwrap();
        let mut newer = sample(Utc::now() + Duration::seconds(60));
        newer.access_token = "newer".to_string();
        store.save(&newer).unwrap();

        assert_eq!(store.load().unwrap().access_token, "newer");
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let store = TokenStore::new(blocker.join("token.json"));
        assert!(matches!(
            store.save(&sample(Utc::now())),
            Err(PersistError::Io { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample(Utc::now())).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_is_valid_delegates_to_expiry() {
        let now = Utc::now();
        assert!(TokenStore::is_valid(&sample(now + Duration::seconds(1)), now));
        assert!(!TokenStore::is_valid(&sample(now), now));
    }
}
