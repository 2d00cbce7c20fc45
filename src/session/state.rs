//! Pure session state transitions
//!
//! [`SessionState`] owns the ordered session list and the active id and
//! performs no I/O. The persisting wrapper lives in the parent module.

use super::types::{preview_of, Message, Role, Session, SessionTexts};
use chrono::{DateTime, Utc};
use ulid::Ulid;

/// Ordered session list plus the active session identifier
///
/// Invariants upheld by every method:
///
/// - sessions are ordered most recently created first
/// - the active id, when present, names a session in the list
/// - every session holds at least one message once it has been
///   created, loaded, or restored
#[derive(Debug, Clone)]
pub struct SessionState {
    sessions: Vec<Session>,
    active: Option<String>,
    texts: SessionTexts,
}

impl SessionState {
    /// Create an empty state
    ///
    /// An empty state has no active session; callers normally follow
    /// with [`SessionState::create`] or use [`SessionState::restore`].
    pub fn new(texts: SessionTexts) -> Self {
        Self {
            sessions: Vec::new(),
            active: None,
            texts,
        }
    }

    /// Rebuild state from previously persisted parts
    ///
    /// Sessions with no messages get the welcome message, stamped with the
    /// session's creation time. The saved active id is honored only if it
    /// names a restored session; otherwise the first session becomes
    /// active. An empty list yields a single fresh session.
    pub fn restore(sessions: Vec<Session>, active: Option<String>, texts: SessionTexts) -> Self {
        let mut state = Self {
            sessions,
            active: None,
            texts,
        };

        let mut repaired = 0;
        for session in &mut state.sessions {
            if session.messages.is_empty() {
                session.messages.push(welcome_message(&state.texts, session.created_at));
                repaired += 1;
            }
        }
        if repaired > 0 {
            tracing::debug!(repaired, "Inserted welcome message into empty sessions");
        }

        if state.sessions.is_empty() {
            state.create();
        } else {
            let id = active
                .filter(|id| state.contains(id))
                .unwrap_or_else(|| state.sessions[0].id.clone());
            state.active = Some(id);
        }

        state
    }

    /// Create a session with a welcome message, put it first, and activate it
    ///
    /// Returns the new session's identifier.
    pub fn create(&mut self) -> String {
        let now = Utc::now();
        let session = Session {
            id: new_session_id(),
            name: self.texts.default_name.clone(),
            preview: self.texts.default_preview.clone(),
            created_at: now,
            messages: vec![welcome_message(&self.texts, now)],
        };
        let id = session.id.clone();

        self.sessions.insert(0, session);
        self.active = Some(id.clone());

        tracing::debug!(session_id = %id, "Created session");
        id
    }

    /// Activate the session `id` and return its messages for display
    ///
    /// Returns `None` and changes nothing when `id` is unknown. An empty
    /// message sequence is repaired with the welcome message first.
    pub fn load(&mut self, id: &str) -> Option<&[Message]> {
        let index = self.index_of(id)?;
        self.active = Some(id.to_string());

        let session = &mut self.sessions[index];
        if session.messages.is_empty() {
            session
                .messages
                .push(welcome_message(&self.texts, session.created_at));
        }

        Some(&self.sessions[index].messages)
    }

    /// Remove the session `id`
    ///
    /// If it was active, the first remaining session becomes active, or a
    /// fresh one is created when none remain. Returns `false` if `id` was
    /// unknown.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.sessions.remove(index);

        if self.active.as_deref() == Some(id) {
            self.active = None;
            match self.sessions.first() {
                Some(first) => self.active = Some(first.id.clone()),
                None => {
                    self.create();
                }
            }
        }

        true
    }

    /// Drop every session and start over with one fresh session
    ///
    /// Returns the fresh session's identifier.
    pub fn clear_all(&mut self) -> String {
        self.sessions.clear();
        self.active = None;
        self.create()
    }

    /// Append `message` to session `id`
    ///
    /// A user-authored message also refreshes the session preview.
    /// Returns `false` if `id` is unknown.
    pub fn append_message(&mut self, id: &str, message: Message) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let session = &mut self.sessions[index];
        if message.role == Role::User {
            session.preview = preview_of(&message.content);
        }
        session.messages.push(message);
        true
    }

    /// Sessions in display order, most recently created first
    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    /// Identifier of the active session, if any
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active session, if any
    pub fn active(&self) -> Option<&Session> {
        self.active.as_deref().and_then(|id| self.get(id))
    }

    /// Look up a session by exact identifier
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Resolve a full identifier or a unique short id to a full identifier
    ///
    /// Short ids are matched case-insensitively against the end of each
    /// session id (see [`Session::short_id`]). Ambiguous or unknown input
    /// resolves to `None`.
    pub fn resolve(&self, id_or_short: &str) -> Option<String> {
        let needle = id_or_short.trim();
        if needle.is_empty() {
            return None;
        }
        if self.contains(needle) {
            return Some(needle.to_string());
        }

        let needle = needle.to_ascii_uppercase();
        let mut matches = self
            .sessions
            .iter()
            .filter(|s| s.id.to_ascii_uppercase().ends_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == id)
    }
}

/// Generate a session identifier from the current time and random bits
pub fn new_session_id() -> String {
    format!("session_{}", Ulid::new())
}

fn welcome_message(texts: &SessionTexts, timestamp: DateTime<Utc>) -> Message {
    Message {
        content: texts.welcome.clone(),
        role: Role::Assistant,
        timestamp,
    }
}
