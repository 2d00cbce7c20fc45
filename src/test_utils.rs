//! Test utilities for Tablechat
//!
//! Fake storage backends, a scripted chat transport, and a view that
//! records what it was asked to display.

use crate::client::{ChatRequest, ChatTransport, TextStream};
use crate::config::Config;
use crate::error::{Result, TablechatError};
use crate::session::Role;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::view::ChatView;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Create a temporary directory for testing
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
server:
  base_url: http://localhost:9000
  chat_path: /chat
  connect_timeout_seconds: 5

chat:
  use_search: true
  search_max_results: 3
  format: html

texts:
  fallback_error: "Xin lỗi, có lỗi xảy ra. Vui lòng thử lại."
  default_session_name: "Phiên mới"
"#
    .to_string()
}

/// In-memory backend whose clones share the same entries
///
/// Lets a test keep a handle on the data after handing a boxed clone to
/// a `SessionStore`.
#[derive(Debug, Clone, Default)]
pub struct SharedMemoryStore(Arc<MemoryStore>);

impl KeyValueStore for SharedMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.0.remove(key)
    }
}

/// Backend where every operation fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(TablechatError::Storage("storage unavailable".to_string()).into())
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(TablechatError::Storage("storage unavailable".to_string()).into())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(TablechatError::Storage("storage unavailable".to_string()).into())
    }
}

/// One scripted response of a [`ScriptedTransport`]
pub enum Script {
    /// `open_stream` fails with this message
    Fail(String),
    /// The stream yields these items, `Err` items as transport errors
    Items(Vec<std::result::Result<String, String>>),
    /// The stream yields whatever the test sends, ending when the sender drops
    Channel(mpsc::UnboundedReceiver<std::result::Result<String, String>>),
}

impl Script {
    /// A successful stream of the given chunks
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::Items(chunks.iter().map(|c| Ok(c.to_string())).collect())
    }
}

/// Chat transport that replays scripted responses in order
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    /// Transport answering successive requests with `scripts`
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Transport whose single response is fed through the returned sender
    pub fn with_channel() -> (Self, mpsc::UnboundedSender<std::result::Result<String, String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(vec![Script::Channel(rx)]), tx)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn transport_error(message: String) -> anyhow::Error {
    TablechatError::Transport(message).into()
}

#[async_trait::async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<TextStream> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();

        match script {
            None => Err(transport_error("no scripted response".to_string())),
            Some(Script::Fail(message)) => Err(transport_error(message)),
            Some(Script::Items(items)) => Ok(Box::pin(futures::stream::iter(
                items.into_iter().map(|item| item.map_err(transport_error)),
            ))),
            Some(Script::Channel(rx)) => Ok(Box::pin(futures::stream::unfold(
                rx,
                |mut rx| async move {
                    rx.recv()
                        .await
                        .map(|item| (item.map_err(transport_error), rx))
                },
            ))),
        }
    }
}

/// Everything a [`RecordingView`] was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Message(Role, String),
    TypingShown,
    TypingHidden,
    ReplyStarted,
    ReplyUpdated(String),
    ReplyEnded,
    InputEnabled(bool),
    Notice(String),
}

/// View that records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
    pub typing: bool,
    pub reply: Option<String>,
}

impl RecordingView {
    /// Every rendering passed to `update_reply`, in order
    pub fn reply_updates(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::ReplyUpdated(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every notice shown, in order
    pub fn notices(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ChatView for RecordingView {
    fn show_message(&mut self, role: Role, rendered: &str) {
        self.events.push(ViewEvent::Message(role, rendered.to_string()));
    }

    fn show_typing(&mut self) {
        self.typing = true;
        self.events.push(ViewEvent::TypingShown);
    }

    fn hide_typing(&mut self) {
        if self.typing {
            self.typing = false;
            self.events.push(ViewEvent::TypingHidden);
        }
    }

    fn begin_reply(&mut self) {
        self.reply = Some(String::new());
        self.events.push(ViewEvent::ReplyStarted);
    }

    fn update_reply(&mut self, rendered: &str) {
        self.reply = Some(rendered.to_string());
        self.events.push(ViewEvent::ReplyUpdated(rendered.to_string()));
    }

    fn end_reply(&mut self) {
        if self.reply.take().is_some() {
            self.events.push(ViewEvent::ReplyEnded);
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.events.push(ViewEvent::InputEnabled(enabled));
    }

    fn show_notice(&mut self, text: &str) {
        self.events.push(ViewEvent::Notice(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(TablechatError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<()> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    fn test_test_config_yaml() {
        let yaml = test_config_yaml();
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.base_url, "http://localhost:9000");
        assert_eq!(config.texts.default_session_name, "Phiên mới");
    }

    #[test]
    fn test_shared_memory_store_clones_share_entries() {
        let a = SharedMemoryStore::default();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_scripted_transport_replays_in_order() {
        use futures::StreamExt;

        let transport = ScriptedTransport::new(vec![
            Script::Fail("down".to_string()),
            Script::chunks(&["a", "b"]),
        ]);
        let request = ChatRequest {
            message: "hi".to_string(),
            session_id: None,
            use_search: false,
        };

        tokio_test::block_on(async {
            assert!(transport.open_stream(&request).await.is_err());
            let stream = transport.open_stream(&request).await.unwrap();
            let parts: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
            assert_eq!(parts, vec!["a", "b"]);
            assert!(transport.open_stream(&request).await.is_err());
        });
        assert_eq!(transport.calls(), 3);
    }

    #[test]
    fn test_test_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }
}
