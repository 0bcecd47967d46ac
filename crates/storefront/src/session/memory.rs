//! Process-local session store.

use std::sync::{PoisonError, RwLock};

use super::{SessionCredential, SessionError, SessionStore};

/// Keeps the credential in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    credential: RwLock<Option<SessionCredential>>,
}

impl MemorySessionStore {
    /// A store that starts out logged in.
    #[must_use]
    pub fn with_credential(credential: SessionCredential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionCredential>, SessionError> {
        // A panic while holding the lock cannot leave a half-written Option.
        let guard = self.credential.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn save(&self, credential: &SessionCredential) -> Result<(), SessionError> {
        let mut guard = self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut guard = self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let store = MemorySessionStore::default();
        assert!(store.load().unwrap().is_none());

        store
            .save(&SessionCredential::from_token("abc123"))
            .unwrap();
        assert_eq!(store.load().unwrap().unwrap().token.expose(), "abc123");

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
