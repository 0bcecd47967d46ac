//! Session context: the stored credential and the auth-change channel.
//!
//! The credential lives behind the [`SessionStore`] trait so the gateway never
//! touches ambient global state. [`Session`] pairs a store with a broadcast
//! channel that tells independently running views (a nav bar, a cart badge)
//! that authentication or cart state changed.
//!
//! # Stores
//!
//! - [`MemorySessionStore`] - process-local, for tests and embedding
//! - [`FileSessionStore`] - JSON file on disk, used by the CLI

mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use std::sync::Arc;

use lm_store_core::{AccessToken, LoginResponse, Role};
use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the auth-change channel. Slow subscribers observe `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Errors raised by a session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing persisted session data failed.
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted session data could not be parsed.
    #[error("Session data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The credential of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    /// Bearer token sent on every authenticated request.
    pub token: AccessToken,
    /// Display name captured at login.
    pub username: Option<String>,
    /// Navigation hint only; see [`Role`].
    pub role: Role,
}

impl SessionCredential {
    /// A credential carrying only a token.
    #[must_use]
    pub fn from_token(token: impl Into<AccessToken>) -> Self {
        Self {
            token: token.into(),
            username: None,
            role: Role::User,
        }
    }
}

impl From<LoginResponse> for SessionCredential {
    fn from(login: LoginResponse) -> Self {
        Self {
            token: login.access_token,
            username: Some(login.user.username),
            role: login.user.role,
        }
    }
}

/// Client-side storage for the session credential.
///
/// Writes only happen on login, logout and when the server rejects the
/// credential, so implementations need no conflict resolution beyond being
/// safe to call from several tasks.
pub trait SessionStore: Send + Sync + 'static {
    /// Read the current credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<SessionCredential>, SessionError>;

    /// Replace the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, credential: &SessionCredential) -> Result<(), SessionError>;

    /// Remove the stored credential. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Same-process notifications about session and cart changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A user logged in.
    LoggedIn {
        /// Who logged in.
        username: String,
        /// Their navigation role.
        role: Role,
    },
    /// The user logged out explicitly.
    LoggedOut,
    /// The server rejected the credential and it was cleared.
    SessionExpired,
    /// Cart contents changed (item added, removed, or checked out).
    CartUpdated,
}

/// Session context shared by the gateway and the services.
///
/// Cheap to clone; all clones share the store and the event channel.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Box<dyn SessionStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl Session {
    /// Create a session context over a store.
    #[must_use]
    pub fn new(store: impl SessionStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                events,
            }),
        }
    }

    /// Read the stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn credential(&self) -> Result<Option<SessionCredential>, SessionError> {
        self.inner.store.load()
    }

    /// Whether a credential is currently stored. Storage errors count as "no".
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.credential(), Ok(Some(_)))
    }

    /// The stored role, defaulting to [`Role::User`] when logged out.
    #[must_use]
    pub fn role(&self) -> Role {
        self.credential()
            .ok()
            .flatten()
            .map_or(Role::User, |c| c.role)
    }

    /// Store a fresh credential after a successful login.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn begin(&self, credential: SessionCredential) -> Result<(), SessionError> {
        self.inner.store.save(&credential)?;
        tracing::info!(role = %credential.role, "Session started");
        self.notify(AuthEvent::LoggedIn {
            username: credential.username.unwrap_or_default(),
            role: credential.role,
        });
        Ok(())
    }

    /// Clear the credential on explicit logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn end(&self) -> Result<(), SessionError> {
        self.inner.store.clear()?;
        tracing::info!("Session ended");
        self.notify(AuthEvent::LoggedOut);
        Ok(())
    }

    /// Clear the credential because the server rejected it.
    ///
    /// Idempotent on the store; emits exactly one [`AuthEvent::SessionExpired`]
    /// per call.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. The event is still sent.
    pub fn expire(&self) -> Result<(), SessionError> {
        let cleared = self.inner.store.clear();
        tracing::warn!("Session credential rejected by server, cleared");
        self.notify(AuthEvent::SessionExpired);
        cleared
    }

    /// Subscribe to session and cart notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// Broadcast an event. Having no subscribers is fine.
    pub fn notify(&self, event: AuthEvent) {
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("subscribers", &self.inner.events.receiver_count())
            .finish()
    }
}
