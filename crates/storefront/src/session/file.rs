//! JSON file session store.
//!
//! Layout mirrors what the browser front end kept in client storage:
//!
//! ```json
//! {"access_token": "...", "username": "ada", "role": "admin"}
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lm_store_core::{AccessToken, Role};
use serde::{Deserialize, Serialize};

use super::{SessionCredential, SessionError, SessionStore};

#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Role,
}

/// Persists the credential to a file between CLI invocations.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// A store backed by `path`. Nothing is touched until the first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionCredential>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredSession = serde_json::from_str(&raw)?;
        if stored.access_token.is_empty() {
            return Ok(None);
        }

        Ok(Some(SessionCredential {
            token: AccessToken::new(stored.access_token),
            username: stored.username,
            role: stored.role,
        }))
    }

    fn save(&self, credential: &SessionCredential) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredSession {
            access_token: credential.token.expose().to_owned(),
            username: credential.username.clone(),
            role: credential.role,
        };
        let json = serde_json::to_vec_pretty(&stored)?;

        // Write then rename so a crash never leaves a truncated token behind
        let staging = self.staging_path();
        fs::write(&staging, json)?;
        restrict_permissions(&staging)?;
        fs::rename(&staging, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Session credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Session credential removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_store() -> FileSessionStore {
        let dir = std::env::temp_dir().join(format!("lm-store-session-{}", uuid::Uuid::new_v4()));
        FileSessionStore::new(dir.join("session.json"))
    }

    #[test]
    fn test_missing_file_means_logged_out() {
        let store = scratch_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = scratch_store();
        let credential = SessionCredential {
            token: AccessToken::new("abc123"),
            username: Some("ada".to_string()),
            role: Role::Admin,
        };

        store.save(&credential).unwrap();

        assert_eq!(store.load().unwrap(), Some(credential));
        assert!(!store.staging_path().exists());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = scratch_store();
        store
            .save(&SessionCredential::from_token("abc123"))
            .unwrap();

        store.clear().unwrap();
        store.clear().unwrap();

        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let store = scratch_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(SessionError::Corrupt(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let store = scratch_store();
        store
            .save(&SessionCredential::from_token("abc123"))
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
