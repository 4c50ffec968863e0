//! Client-side session storage.
//!
//! A session is the triple (token, user, role) and is written and cleared as
//! a unit: readers see either all three keys or none of them. Stores are
//! injected through [`SessionContext`] so HTTP clients never reach for a
//! global.

use super::Error;
use crate::{role::Role, user::UserRecord};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, warn};
use ulid::Ulid;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const ROLE_KEY: &str = "role";

/// Raw view of the store; any key may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(rename = "token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "user", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    #[serde(rename = "role", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none() && self.role.is_none()
    }

    /// The full session, or `None` when any key is missing.
    #[must_use]
    pub fn complete(self) -> Option<Session> {
        match (self.token, self.user, self.role) {
            (Some(token), Some(user), Some(role)) if !token.is_empty() => {
                Some(Session { token, user, role })
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserRecord,
    pub role: Role,
}

impl From<Session> for SessionSnapshot {
    fn from(session: Session) -> Self {
        Self {
            token: Some(session.token),
            user: Some(session.user),
            role: Some(session.role),
        }
    }
}

pub trait SessionStore: Send + Sync {
    /// # Errors
    /// Returns `Error::Store` when the backing storage cannot be read.
    fn get(&self) -> Result<SessionSnapshot, Error>;

    /// Replace whatever is stored with `session`.
    ///
    /// # Errors
    /// Returns `Error::Store` when the backing storage cannot be written.
    fn set(&self, session: &Session) -> Result<(), Error>;

    /// Swap the token of an existing session, keeping user and role.
    ///
    /// # Errors
    /// Returns `Error::Store` when no complete session is stored, so a
    /// refresh can never create a partial one.
    fn set_token(&self, token: &str) -> Result<(), Error> {
        let session = self
            .get()?
            .complete()
            .ok_or_else(|| Error::Store("no session to refresh".to_string()))?;
        self.set(&Session {
            token: token.to_string(),
            ..session
        })
    }

    /// Remove all three keys.
    ///
    /// # Errors
    /// Returns `Error::Store` when the backing storage cannot be written.
    fn clear(&self) -> Result<(), Error>;
}

/// Process-local store, mostly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<SessionSnapshot>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut SessionSnapshot) -> R) -> Result<R, Error> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| Error::Store("session lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl SessionStore for MemoryStore {
    fn get(&self) -> Result<SessionSnapshot, Error> {
        self.with(|snapshot| snapshot.clone())
    }

    fn set(&self, session: &Session) -> Result<(), Error> {
        self.with(|snapshot| *snapshot = session.clone().into())
    }

    fn clear(&self) -> Result<(), Error> {
        self.with(|snapshot| *snapshot = SessionSnapshot::default())
    }
}

/// Durable store: one JSON document holding the three keys.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader sees the old document or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, snapshot: &SessionSnapshot) -> Result<(), Error> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Store(format!("invalid session path: {}", self.path.display())))?;
        let tmp_path = parent.join(format!(".{file_name}.{}.tmp", Ulid::new()));

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| Error::Store(format!("failed to encode session: {err}")))?;

        if let Err(err) = replace_file(&tmp_path, &self.path, &json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        debug!(path = %self.path.display(), "session written");
        Ok(())
    }
}

fn replace_file(tmp_path: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = create_private(tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(tmp_path, target)
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}

impl SessionStore for FileStore {
    fn get(&self) -> Result<SessionSnapshot, Error> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                Error::Store(format!(
                    "corrupt session file {}: {err}",
                    self.path.display()
                ))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SessionSnapshot::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, session: &Session) -> Result<(), Error> {
        self.write(&session.clone().into())
    }

    fn clear(&self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Store handle shared by the auth client, its refresh layer, and the guard.
///
/// Read-modify-write sequences (login, logout, refresh, guard teardown) run
/// under [`SessionContext::lock`] so they never interleave.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    lock: Arc<AsyncMutex<()>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self::from_arc(Arc::new(store))
    }

    #[must_use]
    pub fn from_arc(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            lock: Arc::new(AsyncMutex::new(())),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Current snapshot; an unreadable store reads as empty.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.get().unwrap_or_else(|err| {
            warn!("Failed to read session: {err}");
            SessionSnapshot::default()
        })
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.snapshot().token.filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn session() -> Session {
        Session {
            token: "abc".to_string(),
            user: UserRecord::new("u1", Role::Admin),
            role: Role::Admin,
        }
    }

    #[test]
    fn memory_store_sets_and_clears_as_a_unit() -> Result<(), Error> {
        let store = MemoryStore::new();
        assert!(store.get()?.is_empty());

        store.set(&session())?;
        assert_eq!(store.get()?.complete(), Some(session()));

        store.set_token("def")?;
        let refreshed = store.get()?.complete().ok_or(Error::InvalidServerResponse)?;
        assert_eq!(refreshed.token, "def");
        assert_eq!(refreshed.user, session().user);

        store.clear()?;
        assert!(store.get()?.is_empty());
        Ok(())
    }

    #[test]
    fn set_token_refuses_to_create_partial_sessions() {
        let store = MemoryStore::new();
        assert!(matches!(store.set_token("abc"), Err(Error::Store(_))));
        assert!(matches!(store.get(), Ok(snapshot) if snapshot.is_empty()));
    }

    #[test]
    fn partial_snapshots_are_not_complete() {
        let partial = SessionSnapshot {
            token: Some("abc".to_string()),
            user: None,
            role: Some(Role::Staff),
        };
        assert!(!partial.is_empty());
        assert_eq!(partial.complete(), None);

        let empty_token = SessionSnapshot {
            token: Some(String::new()),
            ..session().into()
        };
        assert_eq!(empty_token.complete(), None);
    }

    #[test]
    fn file_store_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("session.json");

        FileStore::new(&path).set(&session())?;

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get()?.complete(), Some(session()));

        let raw: Value = serde_json::from_slice(&fs::read(&path)?)?;
        assert_eq!(
            raw,
            json!({
                TOKEN_KEY: "abc",
                USER_KEY: {"id": "u1", "role": "admin"},
                ROLE_KEY: "admin"
            })
        );

        reopened.clear()?;
        assert!(!path.exists());
        assert!(reopened.get()?.is_empty());
        // clearing twice is fine
        reopened.clear()?;

        let leftovers = fs::read_dir(dir.path().join("nested"))?.count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private() -> Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        FileStore::new(&path).set(&session())?;
        let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_an_error_and_reads_empty_through_context() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json")?;

        let store = FileStore::new(&path);
        assert!(matches!(store.get(), Err(Error::Store(_))));

        let context = SessionContext::new(store);
        assert!(context.snapshot().is_empty());
        assert_eq!(context.token(), None);
        Ok(())
    }
}
