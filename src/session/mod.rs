//! Session store
//!
//! Keeps the ordered list of chat sessions and mirrors it into a
//! [`KeyValueStore`] after every mutation. State transitions live in
//! [`SessionState`]; [`SessionStore`] adds write-through persistence.
//!
//! Persistence is best effort: a failed write is logged and remembered
//! (see [`SessionStore::last_persist_error`]) but never turns a session
//! operation into an error. Stored state that cannot be parsed at startup
//! is set aside and replaced by a fresh session; a backend that cannot be
//! read at startup is never written to.

use crate::error::{Result, TablechatError};
use crate::storage::{KeyValueStore, ACTIVE_SESSION_KEY, CORRUPT_SESSIONS_KEY, SESSIONS_KEY};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod state;
pub mod types;

pub use state::{new_session_id, SessionState};
pub use types::{
    preview_of, short_id, Message, Role, Session, SessionTexts, PREVIEW_MAX_CHARS,
};

/// Session store shared between the chat controller and the renderer
pub type SharedSessionStore = Arc<Mutex<SessionStore>>;

/// Lock a shared store, recovering the data if a holder panicked
pub fn lock_store(store: &SharedSessionStore) -> MutexGuard<'_, SessionStore> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

/// Session list with write-through persistence
pub struct SessionStore {
    state: SessionState,
    backend: Box<dyn KeyValueStore>,
    last_persist_error: Option<String>,
    read_only: bool,
}

/// Raw entries read from the backend at startup
struct StoredEntries {
    sessions: Option<String>,
    active: Option<String>,
}

impl SessionStore {
    /// Open the store, restoring whatever the backend holds
    ///
    /// Missing entries start a fresh session list. A stored list that
    /// cannot be parsed is copied to [`CORRUPT_SESSIONS_KEY`] and replaced.
    /// The restored state is written back only when it differs from what
    /// was stored, so opening an intact store does not write.
    ///
    /// If the backend cannot be read at all, the session list starts fresh
    /// in memory and nothing is written for the lifetime of this store;
    /// [`SessionStore::last_persist_error`] reports why.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablechat::session::{SessionStore, SessionTexts};
    /// use tablechat::storage::MemoryStore;
    ///
    /// let store = SessionStore::open(Box::new(MemoryStore::new()), SessionTexts::default());
    /// assert_eq!(store.list().len(), 1);
    /// assert!(store.active_id().is_some());
    /// ```
    pub fn open(backend: Box<dyn KeyValueStore>, texts: SessionTexts) -> Self {
        let stored = match read_stored(backend.as_ref()) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Session storage unreadable, changes will not be saved: {}", e);
                let state = SessionState::restore(Vec::new(), None, texts);
                return Self {
                    state,
                    backend,
                    last_persist_error: Some(format!("Session storage could not be read: {}", e)),
                    read_only: true,
                };
            }
        };

        let sessions = match &stored.sessions {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unparseable session list: {}", e);
                if let Err(e) = backend.set(CORRUPT_SESSIONS_KEY, raw) {
                    tracing::warn!("Could not back up unparseable session list: {}", e);
                }
                Vec::new()
            }),
            None => Vec::new(),
        };

        let active = stored.active.clone().filter(|id| !id.is_empty());
        tracing::debug!(sessions = sessions.len(), ?active, "Restoring sessions");

        let state = SessionState::restore(sessions, active, texts);
        let mut store = Self {
            state,
            backend,
            last_persist_error: None,
            read_only: false,
        };
        if store.differs_from(&stored) {
            store.persist_or_warn();
        }
        store
    }

    /// Wrap the store for sharing with a [`crate::renderer::StreamingRenderer`]
    pub fn into_shared(self) -> SharedSessionStore {
        Arc::new(Mutex::new(self))
    }

    /// Create a new active session; see [`SessionState::create`]
    pub fn create(&mut self) -> String {
        let id = self.state.create();
        self.persist_or_warn();
        id
    }

    /// Activate a session and return its messages; see [`SessionState::load`]
    pub fn load(&mut self, id: &str) -> Option<Vec<Message>> {
        let messages = self.state.load(id)?.to_vec();
        self.persist_or_warn();
        Some(messages)
    }

    /// Delete a session; see [`SessionState::delete`]
    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.state.delete(id);
        if removed {
            self.persist_or_warn();
        }
        removed
    }

    /// Replace every session with one fresh session; see [`SessionState::clear_all`]
    pub fn clear_all(&mut self) -> String {
        let id = self.state.clear_all();
        self.persist_or_warn();
        id
    }

    /// Append a message to a session; see [`SessionState::append_message`]
    pub fn append_message(&mut self, session_id: &str, message: Message) -> bool {
        let appended = self.state.append_message(session_id, message);
        if appended {
            self.persist_or_warn();
        }
        appended
    }

    /// Sessions in display order, most recently created first
    pub fn list(&self) -> &[Session] {
        self.state.list()
    }

    /// Identifier of the active session, if any
    pub fn active_id(&self) -> Option<&str> {
        self.state.active_id()
    }

    /// The active session, if any
    pub fn active(&self) -> Option<&Session> {
        self.state.active()
    }

    /// Look up a session by exact identifier
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.state.get(id)
    }

    /// Resolve a full or short identifier; see [`SessionState::resolve`]
    pub fn resolve(&self, id_or_short: &str) -> Option<String> {
        self.state.resolve(id_or_short)
    }

    /// Message of the most recent failed write, cleared by the next success
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Serialize the full session list and active id to the backend
    ///
    /// # Errors
    ///
    /// Returns the first serialization or backend error encountered, or a
    /// storage error if the backend was unreadable when the store opened
    pub fn persist(&self) -> Result<()> {
        if self.read_only {
            return Err(TablechatError::Storage(
                "Session storage could not be read at startup; not overwriting it".to_string(),
            )
            .into());
        }

        let json = serde_json::to_string(self.state.list())
            .map_err(|e| TablechatError::Storage(format!("Failed to serialize sessions: {}", e)))?;
        self.backend.set(SESSIONS_KEY, &json)?;

        match self.state.active_id() {
            Some(id) => self.backend.set(ACTIVE_SESSION_KEY, id)?,
            None => self.backend.remove(ACTIVE_SESSION_KEY)?,
        }

        Ok(())
    }

    fn differs_from(&self, stored: &StoredEntries) -> bool {
        let current = serde_json::to_string(self.state.list()).ok();
        current != stored.sessions || self.state.active_id() != stored.active.as_deref()
    }

    fn persist_or_warn(&mut self) {
        if self.read_only {
            tracing::debug!("Skipping write to unreadable session storage");
            return;
        }
        match self.persist() {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                tracing::warn!("Failed to persist sessions: {}", e);
                self.last_persist_error = Some(e.to_string());
            }
        }
    }
}

fn read_stored(backend: &dyn KeyValueStore) -> Result<StoredEntries> {
    Ok(StoredEntries {
        sessions: backend.get(SESSIONS_KEY)?,
        active: backend.get(ACTIVE_SESSION_KEY)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_utils::{FailingStore, SharedMemoryStore};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn open(backend: &SharedMemoryStore) -> SessionStore {
        SessionStore::open(Box::new(backend.clone()), SessionTexts::default())
    }

    /// Shared backend that can fail one read and counts writes
    #[derive(Clone, Default)]
    struct WatchedStore {
        inner: SharedMemoryStore,
        fail_next_get: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    impl KeyValueStore for WatchedStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail_next_get.swap(false, Ordering::SeqCst) {
                return Err(TablechatError::Storage("read failed".to_string()).into());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_first_run_creates_and_persists_session() {
        let backend = SharedMemoryStore::default();
        let store = open(&backend);

        assert_eq!(store.list().len(), 1);
        let active = store.active_id().unwrap().to_string();
        assert_eq!(backend.get(ACTIVE_SESSION_KEY).unwrap(), Some(active));
        assert!(backend.get(SESSIONS_KEY).unwrap().is_some());
    }

    #[test]
    fn test_state_survives_reopen() {
        let backend = SharedMemoryStore::default();
        let (first, second) = {
            let mut store = open(&backend);
            let first = store.active_id().unwrap().to_string();
            store.append_message(&first, Message::user("remember me"));
            let second = store.create();
            (first, second)
        };

        let store = open(&backend);
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.active_id(), Some(second.as_str()));
        let restored = store.get(&first).unwrap();
        assert_eq!(restored.preview, "remember me");
        assert_eq!(restored.messages.last().unwrap().content, "remember me");
    }

    #[test]
    fn test_reopen_repairs_empty_message_sequence() {
        let backend = SharedMemoryStore::default();
        backend
            .set(
                SESSIONS_KEY,
                r#"[{"id":"session_A","name":"A","preview":"p","created_at":"2024-01-01T00:00:00Z","messages":[]}]"#,
            )
            .unwrap();

        let mut store = open(&backend);
        let messages = store.load("session_A").expect("known session");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);

        // the repair is written back
        let stored = backend.get(SESSIONS_KEY).unwrap().unwrap();
        let parsed: Vec<Session> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed[0].messages.len(), 1);
    }

    #[test]
    fn test_corrupt_stored_state_starts_fresh() {
        let backend = SharedMemoryStore::default();
        backend.set(SESSIONS_KEY, "{not json").unwrap();
        backend.set(ACTIVE_SESSION_KEY, "session_gone").unwrap();

        let store = open(&backend);
        assert_eq!(store.list().len(), 1);
        assert_ne!(store.active_id(), Some("session_gone"));
        assert!(store.last_persist_error().is_none());

        // the unparseable list is set aside, not lost
        assert_eq!(
            backend.get(CORRUPT_SESSIONS_KEY).unwrap().as_deref(),
            Some("{not json")
        );
        let stored: Vec<Session> =
            serde_json::from_str(&backend.get(SESSIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_failed_read_does_not_overwrite_saved_sessions() {
        let backend = WatchedStore::default();
        {
            let mut store = SessionStore::open(Box::new(backend.clone()), SessionTexts::default());
            let first = store.active_id().unwrap().to_string();
            store.append_message(&first, Message::user("keep me"));
            store.create();
            store.create();
        }
        let saved = backend.inner.get(SESSIONS_KEY).unwrap();
        let writes_before = backend.writes.load(Ordering::SeqCst);

        backend.fail_next_get.store(true, Ordering::SeqCst);
        let mut store = SessionStore::open(Box::new(backend.clone()), SessionTexts::default());

        // usable in memory, but flagged as unsaved
        assert_eq!(store.list().len(), 1);
        assert!(store.last_persist_error().is_some());
        let id = store.create();
        assert!(store.append_message(&id, Message::user("not saved")));
        assert!(store.last_persist_error().is_some());

        assert_eq!(backend.writes.load(Ordering::SeqCst), writes_before);
        assert_eq!(backend.inner.get(SESSIONS_KEY).unwrap(), saved);

        // the next healthy open sees every saved session
        let store = SessionStore::open(Box::new(backend.clone()), SessionTexts::default());
        assert_eq!(store.list().len(), 3);
        assert!(store
            .list()
            .iter()
            .any(|s| s.messages.iter().any(|m| m.content == "keep me")));
    }

    #[test]
    fn test_reopening_intact_store_does_not_write() {
        let backend = WatchedStore::default();
        {
            let mut store = SessionStore::open(Box::new(backend.clone()), SessionTexts::default());
            store.create();
        }
        let writes_before = backend.writes.load(Ordering::SeqCst);

        let store = SessionStore::open(Box::new(backend.clone()), SessionTexts::default());
        assert_eq!(store.list().len(), 2);
        assert_eq!(backend.writes.load(Ordering::SeqCst), writes_before);
    }

    #[test]
    fn test_every_mutation_writes_through() {
        let backend = SharedMemoryStore::default();
        let mut store = open(&backend);
        let id = store.active_id().unwrap().to_string();

        store.append_message(&id, Message::user("one"));
        let stored: Vec<Session> =
            serde_json::from_str(&backend.get(SESSIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored[0].messages.len(), 2);

        let other = store.create();
        assert_eq!(backend.get(ACTIVE_SESSION_KEY).unwrap(), Some(other.clone()));

        store.load(&id);
        assert_eq!(backend.get(ACTIVE_SESSION_KEY).unwrap(), Some(id.clone()));

        store.delete(&other);
        let stored: Vec<Session> =
            serde_json::from_str(&backend.get(SESSIONS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_unknown_ids_are_silent_noops() {
        let backend = SharedMemoryStore::default();
        let mut store = open(&backend);
        let before = backend.get(SESSIONS_KEY).unwrap();

        assert!(store.load("session_missing").is_none());
        assert!(!store.delete("session_missing"));
        assert!(!store.append_message("session_missing", Message::user("x")));
        assert_eq!(backend.get(SESSIONS_KEY).unwrap(), before);
    }

    #[test]
    fn test_failing_backend_degrades_gracefully() {
        let mut store = SessionStore::open(Box::new(FailingStore), SessionTexts::default());

        assert_eq!(store.list().len(), 1);
        assert!(store.last_persist_error().is_some());

        let id = store.create();
        assert!(store.append_message(&id, Message::user("still works")));
        assert_eq!(store.get(&id).unwrap().preview, "still works");
    }

    #[test]
    fn test_memory_backend_clear_all() {
        let mut store = SessionStore::open(Box::new(MemoryStore::new()), SessionTexts::default());
        store.create();
        store.create();

        let fresh = store.clear_all();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.active_id(), Some(fresh.as_str()));
    }
}
