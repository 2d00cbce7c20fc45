/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`     — Interactive chat with streamed replies
- `sessions` — List, show, delete, and clear saved sessions
- `search`   — One-off web search through the server
- `report`   — Report document download
*/

use crate::config::Config;
use crate::error::Result;
use crate::session::SessionStore;
use crate::storage::{open_or_memory, KeyValueStore, MemoryStore, SledStore};

// Special commands parser for interactive chat
pub mod special_commands;

// Saved session management
pub mod sessions;

// Web search command
pub mod search;

// Report download command
pub mod report;

/// Open the session store described by `config`
///
/// With `require_durable` an unavailable database is an error. Without
/// it the chat falls back to an in-memory store for this run.
///
/// # Errors
///
/// Returns an error only when `require_durable` is set and the database
/// cannot be opened
pub fn open_session_store(config: &Config, require_durable: bool) -> Result<SessionStore> {
    let texts = config.texts.session_texts();

    let backend: Box<dyn KeyValueStore> = if require_durable {
        Box::new(SledStore::open(config.store_path()?)?)
    } else {
        match config.store_path() {
            Ok(path) => open_or_memory(path).0,
            Err(e) => {
                tracing::warn!("No session storage location, sessions will not be saved: {}", e);
                Box::new(MemoryStore::new())
            }
        }
    };

    Ok(SessionStore::open(backend, texts))
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Opens the session store, wires a [`StreamingRenderer`] to the chat
    //! server, and runs a readline-based loop. Plain input is sent to the
    //! assistant; special commands act on sessions, search, and reports.

    use super::*;
    use crate::client::{ChatTransport, HttpChatClient};
    use crate::commands::special_commands::{parse_special_command, SpecialCommand, HELP_TEXT};
    use crate::renderer::{SendOutcome, StreamingRenderer};
    use crate::session::{lock_store, short_id, SessionStore};
    use crate::view::{ChatView, TerminalView};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::path::PathBuf;

    /// What the chat loop should do after a special command
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum LoopAction {
        /// Read the next line
        Continue,
        /// Leave the chat
        Exit,
        /// Run a web search for this query
        Find(String),
        /// Download the report into this directory
        Report(Option<PathBuf>),
    }

    /// Owns the renderer and session store for one interactive chat
    pub struct ChatController<T: ChatTransport> {
        renderer: StreamingRenderer<T>,
        use_search: bool,
    }

    impl<T: ChatTransport> ChatController<T> {
        /// Create a controller
        pub fn new(renderer: StreamingRenderer<T>, use_search: bool) -> Self {
            Self {
                renderer,
                use_search,
            }
        }

        /// Whether replies are grounded in a web search
        pub fn use_search(&self) -> bool {
            self.use_search
        }

        /// The renderer sending chat messages
        pub fn renderer(&self) -> &StreamingRenderer<T> {
            &self.renderer
        }

        /// Send `input` to the assistant in the active session
        pub async fn submit(&self, input: &str, view: &mut dyn ChatView) -> SendOutcome {
            let outcome = self.renderer.send(input, self.use_search, view).await;
            self.warn_if_unsaved(view);
            outcome
        }

        /// Show every message of the active session
        pub fn show_active(&self, view: &mut dyn ChatView) {
            let messages = lock_store(self.renderer.store())
                .active()
                .map(|s| s.messages.clone())
                .unwrap_or_default();

            for message in &messages {
                view.show_message(message.role, &self.renderer.render(&message.content));
            }
        }

        /// Apply a special command
        ///
        /// Session and search commands are handled here. Commands needing
        /// the server beyond chat are handed back as a [`LoopAction`].
        pub fn apply(&mut self, command: SpecialCommand, view: &mut dyn ChatView) -> LoopAction {
            match command {
                SpecialCommand::None => {}
                SpecialCommand::NewSession => {
                    let id = self.with_store(SessionStore::create);
                    view.show_notice(&format!("Started session {}", short_id(&id)));
                    self.show_active(view);
                }
                SpecialCommand::ListSessions => {
                    let table = {
                        let store = lock_store(self.renderer.store());
                        super::sessions::session_table(store.list(), store.active_id()).to_string()
                    };
                    view.show_notice(&table);
                }
                SpecialCommand::LoadSession(id) => {
                    let loaded = self.with_store(|store| {
                        let full = store.resolve(&id)?;
                        store.load(&full).map(|messages| (full, messages))
                    });
                    match loaded {
                        Some((full, messages)) => {
                            view.show_notice(&format!("Switched to session {}", short_id(&full)));
                            for message in &messages {
                                view.show_message(
                                    message.role,
                                    &self.renderer.render(&message.content),
                                );
                            }
                        }
                        None => view.show_notice(&format!("No session matches '{}'", id)),
                    }
                }
                SpecialCommand::DeleteSession(id) => {
                    let deleted = self.with_store(|store| {
                        let full = store.resolve(&id)?;
                        let was_active = store.active_id() == Some(full.as_str());
                        store.delete(&full);
                        Some((full, was_active))
                    });
                    match deleted {
                        Some((full, was_active)) => {
                            view.show_notice(&format!("Deleted session {}", short_id(&full)));
                            if was_active {
                                self.show_active(view);
                            }
                        }
                        None => view.show_notice(&format!("No session matches '{}'", id)),
                    }
                }
                SpecialCommand::ClearSessions => {
                    let id = self.with_store(SessionStore::clear_all);
                    view.show_notice(&format!(
                        "Cleared all sessions, started {}",
                        short_id(&id)
                    ));
                    self.show_active(view);
                }
                SpecialCommand::SetSearch(on) => {
                    self.use_search = on;
                    view.show_notice(&self.search_status());
                }
                SpecialCommand::ShowSearch => view.show_notice(&self.search_status()),
                SpecialCommand::Help => view.show_notice(HELP_TEXT),
                SpecialCommand::Exit => return LoopAction::Exit,
                SpecialCommand::Find(query) => return LoopAction::Find(query),
                SpecialCommand::Report(dir) => return LoopAction::Report(dir),
            }

            self.warn_if_unsaved(view);
            LoopAction::Continue
        }

        fn with_store<R>(&self, f: impl FnOnce(&mut SessionStore) -> R) -> R {
            let mut store = lock_store(self.renderer.store());
            f(&mut store)
        }

        fn search_status(&self) -> String {
            if self.use_search {
                "Web search is on".to_string()
            } else {
                "Web search is off".to_string()
            }
        }

        fn warn_if_unsaved(&self, view: &mut dyn ChatView) {
            let error = lock_store(self.renderer.store())
                .last_persist_error()
                .map(str::to_string);
            if let Some(e) = error {
                view.show_notice(&format!("Warning: sessions are not being saved ({})", e));
            }
        }
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `search` - Ground replies in a web search from the start
    /// * `session` - Full or short id of the session to open
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the line editor cannot be set up
    pub async fn run_chat(config: Config, search: bool, session: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let client = HttpChatClient::new(&config.server)?;
        let store = open_session_store(&config, false)?.into_shared();
        let renderer = StreamingRenderer::new(
            client.clone(),
            store,
            config.chat.format,
            config.texts.fallback_error.clone(),
        );
        let mut controller = ChatController::new(renderer, search || config.chat.use_search);
        let mut view = TerminalView::stdout();

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&config, controller.use_search());
        match session {
            Some(id) => {
                controller.apply(SpecialCommand::LoadSession(id), &mut view);
            }
            None => {
                controller.show_active(&mut view);
                controller.warn_if_unsaved(&mut view);
            }
        }

        loop {
            let prompt = if controller.use_search() {
                format!("{} ", "you [search]>".cyan().bold())
            } else {
                format!("{} ", "you>".cyan().bold())
            };

            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    if command == SpecialCommand::None {
                        if let SendOutcome::Failed { error } =
                            controller.submit(trimmed, &mut view).await
                        {
                            tracing::debug!("Send failed: {}", error);
                        }
                        continue;
                    }

                    match controller.apply(command, &mut view) {
                        LoopAction::Continue => {}
                        LoopAction::Exit => break,
                        LoopAction::Find(query) => {
                            match client.search(&query, config.chat.search_max_results).await {
                                Ok(results) => {
                                    print!("{}", super::search::format_results(&query, &results))
                                }
                                Err(e) => eprintln!("{}", format!("Search failed: {}", e).red()),
                            }
                        }
                        LoopAction::Report(dir) => {
                            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                            println!("{}", "Generating report...".cyan());
                            match super::report::download_report_to(&client, &dir).await {
                                Ok(path) => println!(
                                    "{}",
                                    format!("Saved report to {}", path.display()).green()
                                ),
                                Err(e) => {
                                    eprintln!("{}", format!("Report failed: {}", e).red())
                                }
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome_banner(config: &Config, use_search: bool) {
        println!();
        println!("{}", "Tablechat".green().bold());
        println!("Server: {}", config.server.base_url.cyan());
        println!(
            "Web search: {}",
            if use_search { "on".green() } else { "off".yellow() }
        );
        println!("Type {} for commands, {} to leave.", "/help".cyan(), "exit".cyan());
        println!();
    }

}
