//! Tablechat - terminal chat client library
//!
//! This library provides the core functionality for Tablechat: a session
//! store that keeps several conversations and mirrors them to disk, and a
//! streaming renderer that sends a message to the chat server and redraws
//! the assistant's reply as it arrives.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session and message types, pure state transitions, and the persisting store
//! - `storage`: Key-value persistence backends (sled, in-memory)
//! - `renderer`: Send cycle state machine and incremental reply rendering
//! - `client`: HTTP client for the chat, search, and report endpoints
//! - `format`: Line break and URL rendering for terminal and HTML output
//! - `view`: Display surface trait and the ANSI terminal implementation
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Handlers behind each CLI command
//!
//! # Example
//!
//! ```no_run
//! use tablechat::client::HttpChatClient;
//! use tablechat::renderer::StreamingRenderer;
//! use tablechat::session::{SessionStore, SessionTexts};
//! use tablechat::storage::MemoryStore;
//! use tablechat::view::TerminalView;
//! use tablechat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let store = SessionStore::open(Box::new(MemoryStore::new()), SessionTexts::default());
//!     let renderer = StreamingRenderer::new(
//!         HttpChatClient::new(&config.server)?,
//!         store.into_shared(),
//!         config.chat.format,
//!         config.texts.fallback_error.clone(),
//!     );
//!
//!     let mut view = TerminalView::stdout();
//!     renderer.send("What sold best today?", false, &mut view).await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod renderer;
pub mod session;
pub mod storage;
pub mod view;

// Re-export commonly used types
pub use client::{ChatRequest, ChatTransport, HttpChatClient};
pub use config::Config;
pub use error::{Result, TablechatError};
pub use format::MarkupFormat;
pub use renderer::{SendOutcome, StreamPhase, StreamingRenderer};
pub use session::{Message, Role, Session, SessionStore};
pub use storage::{KeyValueStore, MemoryStore, SledStore};
pub use view::{ChatView, TerminalView};

#[cfg(test)]
pub mod test_utils;
