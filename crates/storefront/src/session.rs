//! Session context, persisted session storage and the session gate.
//!
//! The auth token is never read from ambient globals. A [`Session`] value is
//! taken from the [`SessionGate`] and passed explicitly to every call that
//! needs it; the gate itself reads the [`SessionStore`] on each query.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a [`SessionStore`].
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("session store lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for SessionStoreError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

// =============================================================================
// Session context
// =============================================================================

/// Explicit session context threaded into storefront calls.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<SecretString>,
    username: Option<String>,
}

impl Session {
    /// A session with no token.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session carrying a bearer token for `username`.
    #[must_use]
    pub fn authenticated(token: SecretString, username: impl Into<String>) -> Self {
        Self {
            token: Some(token),
            username: Some(username.into()),
        }
    }

    /// Bearer token, if logged in.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Logged-in username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// True iff a token is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .finish()
    }
}

/// Session state as persisted between runs.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub username: String,
    /// Wallet balance reported at login.
    #[serde(default)]
    pub balance: Option<i64>,
    pub logged_in_at: DateTime<Utc>,
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .field("balance", &self.balance)
            .field("logged_in_at", &self.logged_in_at)
            .finish()
    }
}

impl From<&StoredSession> for Session {
    fn from(stored: &StoredSession) -> Self {
        Self::authenticated(
            SecretString::from(stored.token.clone()),
            stored.username.clone(),
        )
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Process-wide persisted key-value storage for the session.
pub trait SessionStore: Send + Sync {
    /// Read the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<StoredSession>, SessionStoreError>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError>;

    /// Remove all session-scoped state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Session store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| SessionStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let contents = serde_json::to_string_pretty(session).map_err(|source| {
            SessionStoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        write_private(&self.path, contents.as_bytes()).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Write a file readable only by the current user.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents)
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `session`.
    #[must_use]
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionStoreError> {
        Ok(self.session.lock()?.clone())
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        *self.session.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.session.lock()? = None;
        Ok(())
    }
}

// =============================================================================
// Session Gate
// =============================================================================

/// Predicate over the persisted session, plus login/logout transitions.
#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn SessionStore>,
}

impl SessionGate {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// True iff a session token is currently held in storage.
    ///
    /// Unreadable storage counts as logged out.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.stored().is_some()
    }

    /// Snapshot of the current session to pass into storefront calls.
    #[must_use]
    pub fn session(&self) -> Session {
        self.stored()
            .as_ref()
            .map_or_else(Session::anonymous, Session::from)
    }

    /// Full stored session, including balance and login time.
    #[must_use]
    pub fn stored(&self) -> Option<StoredSession> {
        match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session store");
                None
            }
        }
    }

    /// Persist a freshly issued session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn login(&self, stored: &StoredSession) -> Result<Session, SessionStoreError> {
        self.store.save(stored)?;
        crate::error::set_sentry_user(&stored.username);
        Ok(Session::from(stored))
    }

    /// Clear all session-scoped persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared.
    pub fn logout(&self) -> Result<(), SessionStoreError> {
        self.store.clear()?;
        crate::error::clear_sentry_user();
        Ok(())
    }
}

impl fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGate")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

// =============================================================================
// Navigation affordances
// =============================================================================

/// Header actions available to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Login,
    Register,
    Logout,
    BackToExplore,
}

/// What the header shows for a given session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Username to display, when logged in.
    pub username: Option<String>,
    pub actions: Vec<NavAction>,
}

impl Navigation {
    /// Affordances for `session`. Auth pages (login/register) hide the
    /// login/register buttons and offer a way back to the catalog instead.
    #[must_use]
    pub fn for_session(session: &Session, on_auth_page: bool) -> Self {
        let username = session.username().map(str::to_owned);
        let mut actions = Vec::new();

        if username.is_some() {
            actions.push(NavAction::Logout);
        }
        if on_auth_page {
            actions.push(NavAction::BackToExplore);
        } else if username.is_none() {
            actions.push(NavAction::Login);
            actions.push(NavAction::Register);
        }

        Self { username, actions }
    }
}

/// Token as an `Authorization` header value.
pub(crate) fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn stored(username: &str) -> StoredSession {
        StoredSession {
            token: "tok-123".to_string(),
            username: username.to_string(),
            balance: Some(5000),
            logged_in_at: Utc::now(),
        }
    }

    /// Session file inside a fresh directory, removed when the guard drops.
    fn temp_session_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qkart").join("session.json");
        (dir, path)
    }

    #[test]
    fn test_gate_reads_store_on_every_query() {
        let store = Arc::new(MemorySessionStore::new());
        let gate = SessionGate::new(store.clone());
        assert!(!gate.is_authenticated());

        store.save(&stored("shopper")).unwrap();
        assert!(gate.is_authenticated());

        store.clear().unwrap();
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn test_gate_login_and_logout() {
        let gate = SessionGate::new(Arc::new(MemorySessionStore::new()));
        let session = gate.login(&stored("shopper")).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.username(), Some("shopper"));
        assert_eq!(gate.session().username(), Some("shopper"));

        gate.logout().unwrap();
        assert!(!gate.is_authenticated());
        assert!(!gate.session().is_authenticated());
        assert!(gate.stored().is_none());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session::authenticated(SecretString::from("super_secret"), "shopper");
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super_secret"));

        let debug = format!("{:?}", stored("shopper"));
        assert!(!debug.contains("tok-123"));
    }

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let (_dir, path) = temp_session_path();
        let store = FileSessionStore::new(&path);
        assert!(store.load().unwrap().is_none());

        store.save(&stored("shopper")).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.username, "shopper");
        assert_eq!(loaded.token, "tok-123");
        assert_eq!(loaded.balance, Some(5000));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let (_dir, path) = temp_session_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(SessionStoreError::Corrupt { .. })
        ));
        assert!(!SessionGate::new(Arc::new(store)).is_authenticated());
    }

    #[test]
    fn test_navigation_logged_out() {
        let nav = Navigation::for_session(&Session::anonymous(), false);
        assert_eq!(nav.username, None);
        assert_eq!(nav.actions, vec![NavAction::Login, NavAction::Register]);
    }

    #[test]
    fn test_navigation_logged_in() {
        let session = Session::authenticated(SecretString::from("t"), "shopper");
        let nav = Navigation::for_session(&session, false);
        assert_eq!(nav.username.as_deref(), Some("shopper"));
        assert_eq!(nav.actions, vec![NavAction::Logout]);
    }

    #[test]
    fn test_navigation_auth_page() {
        let nav = Navigation::for_session(&Session::anonymous(), true);
        assert_eq!(nav.actions, vec![NavAction::BackToExplore]);
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(bearer(&SecretString::from("abc")), "Bearer abc");
    }
}
