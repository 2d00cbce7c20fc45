//! Key-value persistence for chat sessions
//!
//! The session store mirrors its state into two string entries of a
//! key-value backend. Backends implement [`KeyValueStore`] and report
//! failures explicitly so the caller can degrade instead of aborting.

use crate::error::{Result, TablechatError};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub mod sled_store;
pub use sled_store::SledStore;

/// Key holding the JSON-serialized session list
pub const SESSIONS_KEY: &str = "chat_sessions";

/// Key holding the active session identifier as a plain string
pub const ACTIVE_SESSION_KEY: &str = "current_session_id";

/// Key receiving a session list that could not be parsed at startup
pub const CORRUPT_SESSIONS_KEY: &str = "chat_sessions.corrupt";

/// Fallible string key-value storage
///
/// All writes are synchronous: once `set` or `remove` returns `Ok`, the
/// value is durable for the backend's notion of durability.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile backend used when no durable storage is wanted or available
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Default location of the session database
///
/// Honors `TABLECHAT_STORE_PATH`, otherwise uses the platform data
/// directory (e.g. `~/.local/share/tablechat/sessions.db` on Linux).
pub fn default_store_path() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("TABLECHAT_STORE_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let proj_dirs = ProjectDirs::from("com", "tablechat", "tablechat")
        .ok_or_else(|| TablechatError::Storage("Could not determine data directory".into()))?;

    Ok(proj_dirs.data_dir().join("sessions.db"))
}

/// Open the durable store at `path`, falling back to memory on failure
///
/// Returns the backend and whether it is durable. An unopenable database
/// (locked by another process, unreadable directory) is logged and
/// replaced by a [`MemoryStore`] so the chat still works for this run.
pub fn open_or_memory(path: PathBuf) -> (Box<dyn KeyValueStore>, bool) {
    match SledStore::open(&path) {
        Ok(store) => (Box::new(store), true),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "Session storage unavailable, sessions will not be saved: {}",
                e
            );
            (Box::new(MemoryStore::new()), false)
        }
    }
}
