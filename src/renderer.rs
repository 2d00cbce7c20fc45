//! Streaming renderer
//!
//! Drives one send cycle: record the user message, issue the chat
//! request, redraw the growing reply on every received increment, and
//! commit the finished reply to the session store.
//!
//! ```text
//! Idle -> Sending -> Streaming -> Idle
//!            \           \
//!             +-> Error <-+-> Idle
//! ```
//!
//! Only one cycle runs at a time. A send attempted while the renderer is
//! not idle is rejected without issuing a request.

use crate::client::{ChatRequest, ChatTransport};
use crate::error::Result;
use crate::format::MarkupFormat;
use crate::session::{lock_store, Message, Role, SharedSessionStore};
use crate::view::ChatView;
use futures::StreamExt;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Where the renderer is in its send cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Ready to accept a send
    Idle,
    /// Request issued, waiting for the response to start
    Sending,
    /// Response body is arriving
    Streaming,
    /// The cycle failed; returns to idle once the failure is shown
    Error,
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
            Self::Streaming => write!(f, "streaming"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of one call to [`StreamingRenderer::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty after trimming; nothing happened
    Empty,
    /// Another send is in flight; nothing happened
    Busy,
    /// The reply streamed to completion
    Completed {
        /// Full accumulated reply text
        reply: String,
    },
    /// The request or stream failed and the fallback message was shown
    Failed {
        /// Description of the underlying failure
        error: String,
    },
}

/// Sends chat messages and renders streamed replies
pub struct StreamingRenderer<T: ChatTransport> {
    transport: T,
    store: SharedSessionStore,
    phase: Mutex<StreamPhase>,
    format: MarkupFormat,
    fallback_message: String,
}

/// Holds the view for one cycle; re-enables input and returns the
/// renderer to `Idle` when the cycle ends, including when the send
/// future is dropped
struct CycleGuard<'a, 'v> {
    phase: &'a Mutex<StreamPhase>,
    view: &'v mut dyn ChatView,
}

impl Drop for CycleGuard<'_, '_> {
    fn drop(&mut self) {
        self.view.set_input_enabled(true);
        *lock_phase(self.phase) = StreamPhase::Idle;
        tracing::debug!(phase = %StreamPhase::Idle, "Send cycle finished");
    }
}

fn lock_phase(phase: &Mutex<StreamPhase>) -> MutexGuard<'_, StreamPhase> {
    phase.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T: ChatTransport> StreamingRenderer<T> {
    /// Create a renderer
    ///
    /// # Arguments
    ///
    /// * `transport` - Source of streamed replies
    /// * `store` - Session store that receives user and assistant messages
    /// * `format` - How message text is rendered for the view
    /// * `fallback_message` - Text shown (and recorded) when a send fails
    pub fn new(
        transport: T,
        store: SharedSessionStore,
        format: MarkupFormat,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            phase: Mutex::new(StreamPhase::Idle),
            format,
            fallback_message: fallback_message.into(),
        }
    }

    /// Current phase of the send cycle
    pub fn phase(&self) -> StreamPhase {
        *lock_phase(&self.phase)
    }

    /// Whether a send would currently be accepted
    pub fn is_idle(&self) -> bool {
        self.phase() == StreamPhase::Idle
    }

    /// The transport replies are streamed from
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The session store this renderer writes to
    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Render `text` in the configured format
    pub fn render(&self, text: &str) -> String {
        self.format.render(text)
    }

    /// Send `input` and stream the reply into `view`
    ///
    /// The user message is appended to the active session before the
    /// request goes out. The finished reply is committed to the session
    /// that was active when the send started, provided it still exists
    /// and the reply is not blank. On failure the fallback message is
    /// shown and recorded in that session instead.
    ///
    /// Input is disabled on the view for the duration of the cycle and
    /// re-enabled however the cycle ends.
    pub async fn send(&self, input: &str, use_search: bool, view: &mut dyn ChatView) -> SendOutcome {
        let message = input.trim();
        if message.is_empty() {
            return SendOutcome::Empty;
        }

        let Some(mut cycle) = self.try_begin(view) else {
            tracing::debug!(phase = %self.phase(), "Rejected send while a reply is in flight");
            return SendOutcome::Busy;
        };

        cycle.view.show_message(Role::User, &self.render(message));

        let session_id = {
            let mut store = lock_store(&self.store);
            let id = store.active_id().map(str::to_string);
            if let Some(id) = &id {
                store.append_message(id, Message::user(message));
            }
            id
        };

        cycle.view.set_input_enabled(false);
        cycle.view.show_typing();

        let request = ChatRequest {
            message: message.to_string(),
            session_id: session_id.clone(),
            use_search,
        };

        let result = self.stream_reply(&request, &mut *cycle.view).await;

        match result {
            Ok(reply) => {
                if !reply.trim().is_empty() {
                    if let Some(id) = &session_id {
                        lock_store(&self.store).append_message(id, Message::assistant(reply.as_str()));
                    }
                }
                tracing::info!(chars = reply.chars().count(), "Reply complete");
                SendOutcome::Completed { reply }
            }
            Err(e) => {
                self.set_phase(StreamPhase::Error);
                tracing::warn!("Chat request failed: {:#}", e);

                cycle.view.hide_typing();
                cycle.view.end_reply();
                cycle
                    .view
                    .show_message(Role::Assistant, &self.render(&self.fallback_message));
                if let Some(id) = &session_id {
                    lock_store(&self.store)
                        .append_message(id, Message::assistant(self.fallback_message.as_str()));
                }
                SendOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    fn try_begin<'v>(&self, view: &'v mut dyn ChatView) -> Option<CycleGuard<'_, 'v>> {
        let mut phase = lock_phase(&self.phase);
        if *phase != StreamPhase::Idle {
            return None;
        }
        *phase = StreamPhase::Sending;
        tracing::debug!(phase = %StreamPhase::Sending, "Send cycle started");
        Some(CycleGuard {
            phase: &self.phase,
            view,
        })
    }

    fn set_phase(&self, next: StreamPhase) {
        *lock_phase(&self.phase) = next;
        tracing::debug!(phase = %next, "Phase changed");
    }

    async fn stream_reply(&self, request: &ChatRequest, view: &mut dyn ChatView) -> Result<String> {
        let mut stream = self.transport.open_stream(request).await?;

        self.set_phase(StreamPhase::Streaming);
        view.hide_typing();
        view.begin_reply();

        let mut accumulator = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            accumulator.push_str(&chunk);
            view.update_reply(&self.render(&accumulator));
        }

        view.end_reply();
        Ok(accumulator)
    }
}
