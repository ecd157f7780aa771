//! Session store - holds the signed-in user and persists it across restarts.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{Session, User};

/// Shared session state with change notification.
///
/// Cloning yields another handle to the same state. Consumers either read
/// the current session on demand or [`subscribe`](Self::subscribe) to be
/// told when it changes. No network calls originate here.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<Session>>,
    generation: Arc<AtomicU64>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Open a store persisted at `path`, loading any saved session.
    ///
    /// A missing or unreadable file yields an anonymous session.
    pub fn open(path: PathBuf) -> Self {
        let session = match Self::read(&path) {
            Ok(Some(session)) => {
                debug!("Loaded saved session from {}", path.display());
                session
            }
            Ok(None) => Session::anonymous(),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {:#}", path.display(), e);
                Session::anonymous()
            }
        };

        Self {
            state: Arc::new(watch::Sender::new(session)),
            generation: Arc::new(AtomicU64::new(0)),
            path: Some(path),
        }
    }

    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(Session::anonymous())),
            generation: Arc::new(AtomicU64::new(0)),
            path: None,
        }
    }

    fn read(path: &Path) -> Result<Option<Session>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read session file"),
        };
        let session = serde_json::from_str(&content).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Current bearer token, if signed in.
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    /// Current user, if signed in.
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Counter bumped on every login and on every logout that clears a session.
    ///
    /// Work started under one generation can compare it later to tell
    /// whether the session it ran for is still the current one.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Receive a notification whenever the session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Replace the session with a signed-in one.
    ///
    /// The in-memory state always changes; an error means only that the
    /// session could not be written to disk.
    pub fn login(&self, token: String, user: User) -> Result<()> {
        info!("Signed in as {}", user.username);
        let session = Session::authenticated(token, user);
        self.state.send_replace(session.clone());
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.persist(&session)
    }

    /// Clear the session. Idempotent.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.state.send_if_modified(|session| {
            if session.is_authenticated() {
                *session = Session::anonymous();
                true
            } else {
                false
            }
        });
        if cleared {
            self.generation.fetch_add(1, Ordering::SeqCst);
            info!("Signed out");
        }

        let Some(path) = &self.path else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove session file"),
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let content = serde_json::to_string_pretty(session)?;
        fs::write(path, content).context("Failed to write session file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OpaqueId;
    use tempfile::TempDir;

    fn user() -> User {
        User {
            id: OpaqueId::new("u-1"),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_starts_anonymous() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());
        assert!(store.user().is_none());
    }

    #[test]
    fn test_authenticated_iff_token_present() {
        let store = SessionStore::in_memory();
        let steps = [true, true, false, true, false, false];
        for login in steps {
            if login {
                store.login("tok".to_string(), user()).unwrap();
            } else {
                store.logout().unwrap();
            }
            assert_eq!(store.is_authenticated(), store.token().is_some());
            assert_eq!(store.token().is_some(), store.user().is_some());
        }
    }

    #[test]
    fn test_login_overwrites_existing_session() {
        let store = SessionStore::in_memory();
        store.login("first".to_string(), user()).unwrap();
        store.login("second".to_string(), user()).unwrap();
        assert_eq!(store.token().as_deref(), Some("second"));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let store = SessionStore::in_memory();
        store.logout().unwrap();
        store.login("tok".to_string(), user()).unwrap();
        store.logout().unwrap();
        store.logout().unwrap();
        assert_eq!(store.session(), Session::anonymous());
    }

    #[test]
    fn test_generation_tracks_session_changes() {
        let store = SessionStore::in_memory();
        let start = store.generation();

        store.logout().unwrap();
        assert_eq!(store.generation(), start);

        store.login("tok".to_string(), user()).unwrap();
        let signed_in = store.generation();
        assert_ne!(signed_in, start);

        // Same token again is still a new session.
        store.logout().unwrap();
        store.login("tok".to_string(), user()).unwrap();
        assert_ne!(store.generation(), signed_in);

        // Clones share the counter.
        let other = store.clone();
        other.logout().unwrap();
        assert_eq!(store.generation(), other.generation());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = SessionStore::open(path.clone());
        store.login("tok".to_string(), user()).unwrap();

        let reopened = SessionStore::open(path.clone());
        assert_eq!(reopened.token().as_deref(), Some("tok"));
        assert_eq!(reopened.user(), Some(user()));

        reopened.logout().unwrap();
        assert!(!path.exists());
        assert!(!SessionStore::open(path).is_authenticated());
    }

    #[test]
    fn test_corrupt_file_loads_anonymous() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        assert!(!SessionStore::open(path).is_authenticated());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.login("tok".to_string(), user()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        // Logging out twice notifies once.
        store.logout().unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        store.logout().unwrap();
        assert!(!rx.has_changed().unwrap());
    }
}
