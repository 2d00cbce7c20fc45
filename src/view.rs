//! Display surface for chat messages
//!
//! The streaming renderer and the chat controller draw through
//! [`ChatView`]; they never print directly. [`TerminalView`] is the
//! interactive implementation. All strings passed in are already
//! rendered by [`crate::format::MarkupFormat`].

use crate::session::Role;
use colored::Colorize;
use regex::Regex;
use std::io::Write;
use std::sync::OnceLock;

/// Visible width of the `AI: ` label that starts a reply
const REPLY_LABEL_WIDTH: usize = 4;

/// Something that can show chat messages
pub trait ChatView: Send {
    /// Show a complete message
    fn show_message(&mut self, role: Role, rendered: &str);

    /// Show the "assistant is typing" indicator
    fn show_typing(&mut self);

    /// Remove the typing indicator if it is shown
    fn hide_typing(&mut self);

    /// Open an empty placeholder for a streamed assistant reply
    fn begin_reply(&mut self);

    /// Replace the placeholder content with `rendered`
    fn update_reply(&mut self, rendered: &str);

    /// Close the placeholder; later calls start a new message
    fn end_reply(&mut self);

    /// Enable or disable user input while a reply is in flight
    fn set_input_enabled(&mut self, enabled: bool);

    /// Show an informational line that is not part of the conversation
    fn show_notice(&mut self, text: &str);
}

/// ANSI terminal implementation of [`ChatView`]
///
/// A streamed reply is redrawn in place: when the new rendering extends
/// what is already on screen only the new tail is written, otherwise the
/// reply's rows are erased and the whole rendering is written again.
/// With a known terminal width, lines longer than the width count as
/// the rows they wrap onto.
pub struct TerminalView<W: Write + Send = std::io::Stdout> {
    out: W,
    reply: Option<String>,
    typing: bool,
    input_enabled: bool,
    columns: Option<usize>,
}

impl TerminalView<std::io::Stdout> {
    /// Create a view writing to standard output, sized to the terminal
    pub fn stdout() -> Self {
        let columns = match crossterm::terminal::size() {
            Ok((columns, _)) => Some(usize::from(columns)),
            Err(e) => {
                tracing::debug!("Terminal size unknown, not accounting for wrapping: {}", e);
                None
            }
        };
        Self::new(std::io::stdout()).with_columns(columns)
    }
}

impl<W: Write + Send> TerminalView<W> {
    /// Create a view writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            reply: None,
            typing: false,
            input_enabled: true,
            columns: None,
        }
    }

    /// Set the terminal width used to count wrapped rows
    pub fn with_columns(mut self, columns: Option<usize>) -> Self {
        self.columns = columns.filter(|c| *c > 0);
        self
    }

    /// Whether input is currently accepted
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Consume the view and return the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn label(role: Role) -> String {
        match role {
            Role::User => format!("{}", "You:".cyan().bold()),
            Role::Assistant => format!("{}", "AI:".green().bold()),
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            tracing::debug!("Terminal write failed: {}", e);
        }
    }

    /// Rows between the first row of the reply and the cursor
    fn rows_above_cursor(&self, shown: &str) -> usize {
        let visible = strip_escapes(shown);
        let Some(columns) = self.columns else {
            return visible.matches('\n').count();
        };

        let rows: usize = visible
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                let label = if i == 0 { REPLY_LABEL_WIDTH } else { 0 };
                let width = (line.chars().count() + label).max(1);
                (width + columns - 1) / columns
            })
            .sum();
        rows.saturating_sub(1)
    }
}

impl<W: Write + Send> ChatView for TerminalView<W> {
    fn show_message(&mut self, role: Role, rendered: &str) {
        let line = format!("{} {}\n\n", Self::label(role), rendered);
        self.write(&line);
    }

    fn show_typing(&mut self) {
        if !self.typing {
            self.typing = true;
            let line = format!("{} {}", Self::label(Role::Assistant), "...".dimmed());
            self.write(&line);
        }
    }

    fn hide_typing(&mut self) {
        if self.typing {
            self.typing = false;
            self.write("\r\x1b[2K");
        }
    }

    fn begin_reply(&mut self) {
        let label = format!("{} ", Self::label(Role::Assistant));
        self.write(&label);
        self.reply = Some(String::new());
    }

    fn update_reply(&mut self, rendered: &str) {
        let Some(shown) = self.reply.take() else {
            return;
        };

        if let Some(tail) = rendered.strip_prefix(shown.as_str()) {
            self.write(tail);
        } else {
            let rows = self.rows_above_cursor(&shown);
            let mut redraw = String::new();
            if rows > 0 {
                redraw.push_str(&format!("\x1b[{}F", rows));
            }
            redraw.push_str("\r\x1b[J");
            redraw.push_str(&Self::label(Role::Assistant));
            redraw.push(' ');
            redraw.push_str(rendered);
            self.write(&redraw);
        }

        self.reply = Some(rendered.to_string());
    }

    fn end_reply(&mut self) {
        if self.reply.take().is_some() {
            self.write("\n\n");
        }
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        tracing::trace!(enabled, "Input toggled");
    }

    fn show_notice(&mut self, text: &str) {
        let line = format!("{}\n", text.yellow());
        self.write(&line);
    }
}

/// Remove CSI and OSC escape sequences, leaving the printed text
fn strip_escapes(text: &str) -> std::borrow::Cow<'_, str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)")
                .expect("valid escape pattern")
        })
        .replace_all(text, "")
}
