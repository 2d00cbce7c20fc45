//! Message formatting
//!
//! Rendering interprets exactly two things in message text: line breaks
//! and bare `http://` / `https://` URLs. Everything else is shown
//! literally. The text is split into URL and non-URL segments first and
//! each segment is rendered on its own, so the result does not depend on
//! the order in which line breaks and links are handled.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Output flavour for rendered messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupFormat {
    /// ANSI terminal: newlines kept, URLs become OSC 8 hyperlinks
    #[default]
    Terminal,
    /// HTML fragment: text escaped, `<br>` breaks, `<a>` links
    Html,
    /// Text passed through unchanged
    Plain,
}

impl fmt::Display for MarkupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => write!(f, "terminal"),
            Self::Html => write!(f, "html"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

impl MarkupFormat {
    /// Render `text` in this format
    ///
    /// # Examples
    ///
    /// ```
    /// use tablechat::format::MarkupFormat;
    ///
    /// let html = MarkupFormat::Html.render("http://x.com hi");
    /// assert_eq!(
    ///     html,
    ///     r#"<a href="http://x.com" target="_blank" rel="noopener">http://x.com</a> hi"#
    /// );
    /// ```
    pub fn render(&self, text: &str) -> String {
        match self {
            Self::Terminal => render_with(text, terminal_text, terminal_link),
            Self::Html => render_with(text, html_text, html_link),
            Self::Plain => text.to_string(),
        }
    }
}

/// A piece of message text, either a bare URL or anything else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, possibly containing line breaks
    Text(&'a str),
    /// A bare `http(s)://` URL, ending at the next whitespace
    Url(&'a str),
}

/// Split `text` into alternating text and URL segments
///
/// Empty text segments are omitted.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;

    for m in url_pattern().find_iter(text) {
        if m.start() > last {
            out.push(Segment::Text(&text[last..m.start()]));
        }
        out.push(Segment::Url(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        out.push(Segment::Text(&text[last..]));
    }

    out
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // constant pattern, compilation cannot fail
    PATTERN.get_or_init(|| Regex::new(r"https?://\S+").expect("valid URL pattern"))
}

fn render_with(text: &str, on_text: fn(&str, &mut String), on_link: fn(&str, &mut String)) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Text(t) => on_text(t, &mut out),
            Segment::Url(u) => on_link(u, &mut out),
        }
    }
    out
}

fn html_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '\n' => out.push_str("<br>"),
            '\r' => {}
            other => push_html_escaped(other, out),
        }
    }
}

fn html_link(url: &str, out: &mut String) {
    let mut escaped = String::with_capacity(url.len());
    for c in url.chars() {
        push_html_escaped(c, &mut escaped);
    }
    out.push_str(&format!(
        r#"<a href="{0}" target="_blank" rel="noopener">{0}</a>"#,
        escaped
    ));
}

fn push_html_escaped(c: char, out: &mut String) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        other => out.push(other),
    }
}

fn terminal_text(text: &str, out: &mut String) {
    // drop stray escape bytes so server text cannot drive the terminal
    out.extend(text.chars().filter(|c| *c == '\n' || *c == '\t' || !c.is_control()));
}

fn terminal_link(url: &str, out: &mut String) {
    let url: String = url.chars().filter(|c| !c.is_control()).collect();
    out.push_str(&format!("\x1b]8;;{0}\x1b\\{0}\x1b]8;;\x1b\\", url));
}
