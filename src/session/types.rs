use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters kept in a session preview
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Marker appended to a truncated preview
pub const PREVIEW_ELLIPSIS: &str = "...";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person at the terminal
    User,
    /// Produced by the chat endpoint (or synthesized locally)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message text, possibly containing formatting markup
    pub content: String,
    /// Who wrote the message
    pub role: Role,
    /// When the message was recorded
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Role::User)
    }

    /// Create an assistant message stamped with the current time
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Role::Assistant)
    }

    fn new(content: impl Into<String>, role: Role) -> Self {
        Self {
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }
}

/// One persisted conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier, `session_<ULID>`
    pub id: String,
    /// Display name shown in the session list
    #[serde(default)]
    pub name: String,
    /// Truncated snippet of the most recent user message
    #[serde(default)]
    pub preview: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Messages in chronological (insertion) order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    /// Short identifier for display: the last 8 characters of the id
    ///
    /// The tail of a ULID is random, so two sessions created in the same
    /// millisecond still get distinct short ids.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// Last eight characters of a session identifier, as shown to users
pub fn short_id(id: &str) -> &str {
    let start = id.len().saturating_sub(8);
    id.get(start..).unwrap_or(id)
}

/// Localizable texts synthesized by the session store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTexts {
    /// Body of the welcome message every session starts with
    pub welcome: String,
    /// Name given to newly created sessions
    pub default_name: String,
    /// Preview shown before the first user message
    pub default_preview: String,
}

impl Default for SessionTexts {
    fn default() -> Self {
        Self {
            welcome: "Hello! I am the restaurant assistant. I can help you:\n\
                      - manage the menu and orders\n\
                      - analyze revenue\n\
                      - advise on running the restaurant\n\
                      - answer other questions\n\
                      What can I do for you today?"
                .to_string(),
            default_name: "New session".to_string(),
            default_preview: "Start a new conversation".to_string(),
        }
    }
}

/// Compute the preview for a user message
///
/// Keeps the first [`PREVIEW_MAX_CHARS`] characters and appends
/// [`PREVIEW_ELLIPSIS`] when anything was cut.
///
/// # Examples
///
/// ```
/// use tablechat::session::preview_of;
///
/// assert_eq!(preview_of("short"), "short");
/// assert_eq!(preview_of(&"a".repeat(51)), format!("{}...", "a".repeat(50)));
/// ```
pub fn preview_of(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}{}", head, PREVIEW_ELLIPSIS)
    } else {
        head
    }
}
