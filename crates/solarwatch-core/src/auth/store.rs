//! Durable session storage.
//!
//! A store holds exactly two keyed values: the credential string under
//! `authToken` and the serialized user profile under `user`. A store that
//! finds only one of them reports no session at all.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::session::{Session, UserProfile};

/// Key for the credential string
pub const TOKEN_KEY: &str = "authToken";

/// Key for the serialized user profile
pub const USER_KEY: &str = "user";

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Process-wide session state shared by the pipeline and the UI.
///
/// Implementations never touch the network and never expire sessions on
/// their own; expiry is checked lazily when a request is dispatched.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Result<Option<Session>>;

    /// Replace the stored session as a whole
    fn set(&self, session: &Session) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

// ============================================================================
// Memory
// ============================================================================

/// In-process store, lost when the process exits.
#[derive(Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<Session>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<Session>> {
        let guard = self.session.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    fn set(&self, session: &Session) -> Result<()> {
        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

/// On-disk layout of the session document
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
}

impl StoredSession {
    fn into_session(self) -> Option<Session> {
        match (self.auth_token, self.user) {
            (Some(token), Some(user)) => Some(Session::new(token, user)),
            _ => None,
        }
    }
}

/// Session persisted as a JSON document in the data directory.
pub struct FileTokenStore {
    data_dir: PathBuf,
    lock: RwLock<()>,
}

impl FileTokenStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    fn read(path: &Path) -> Result<Option<Session>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) => Ok(stored.into_session()),
            Err(e) => {
                warn!(error = %e, "Session file is unreadable, treating as signed out");
                Ok(None)
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<Session>> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        Self::read(&self.path())
    }

    fn set(&self, session: &Session) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        std::fs::create_dir_all(&self.data_dir).context("Failed to create data directory")?;

        let stored = StoredSession {
            auth_token: Some(session.credential().to_string()),
            user: Some(session.user().clone()),
        };
        let contents = serde_json::to_string_pretty(&stored)?;

        // Write then rename so readers see either the old or the new session
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &path).context("Failed to replace session file")?;
        debug!(path = %path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

// ============================================================================
// Keyring
// ============================================================================

/// Keyed secret storage behind the keyring session store.
pub trait SecretBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Deleting a missing key is not an error
    fn delete(&self, key: &str) -> Result<()>;
}

/// The OS keychain, one entry per key under a service name.
pub struct OsKeychain {
    service: String,
}

impl OsKeychain {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl SecretBackend for OsKeychain {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read from keychain"),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

/// Session kept as two secret entries, the OS keychain by default.
pub struct KeyringTokenStore<B: SecretBackend = OsKeychain> {
    backend: B,
    lock: RwLock<()>,
}

impl KeyringTokenStore<OsKeychain> {
    pub fn new(service: impl Into<String>) -> Self {
        Self::with_backend(OsKeychain::new(service))
    }
}

impl<B: SecretBackend> KeyringTokenStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            lock: RwLock::new(()),
        }
    }

    fn clear_entries(&self) -> Result<()> {
        self.backend.delete(TOKEN_KEY)?;
        self.backend.delete(USER_KEY)
    }
}

impl<B: SecretBackend> TokenStore for KeyringTokenStore<B> {
    fn get(&self) -> Result<Option<Session>> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let token = self.backend.read(TOKEN_KEY)?;
        let user = match self.backend.read(USER_KEY)? {
            Some(raw) => serde_json::from_str::<UserProfile>(&raw).ok(),
            None => None,
        };
        Ok(StoredSession {
            auth_token: token,
            user,
        }
        .into_session())
    }

    fn set(&self, session: &Session) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let user = serde_json::to_string(session.user())?;

        // The old token goes first, so a failure part way leaves no session
        // rather than the old token paired with the new profile.
        self.backend.delete(TOKEN_KEY)?;
        self.backend.write(USER_KEY, &user)?;
        if let Err(e) = self.backend.write(TOKEN_KEY, session.credential()) {
            if let Err(clear) = self.clear_entries() {
                warn!(error = %clear, "Failed to roll back partial keychain session");
            }
            return Err(e);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        self.clear_entries()
    }
}

// ============================================================================
// Tests
// ============================================================================
