//! Special commands parser for interactive chat mode
//!
//! This module parses special commands entered during an interactive chat.
//! Special commands allow users to:
//! - Start, list, switch, delete, and clear sessions
//! - Toggle search-grounded replies
//! - Run a web search or download the report
//! - Display help information
//! - Exit the chat
//!
//! Commands are prefixed with `/` and the command word is case-insensitive.
//! Arguments keep their case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on the sessions or the client itself rather than
/// being sent to the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new session and make it active
    NewSession,

    /// List saved sessions
    ListSessions,

    /// Switch to a session by full or short id
    LoadSession(String),

    /// Delete a session by full or short id
    DeleteSession(String),

    /// Delete every session and start a fresh one
    ClearSessions,

    /// Turn search-grounded replies on or off
    SetSearch(bool),

    /// Show whether search-grounded replies are on
    ShowSearch,

    /// Run a web search and print the results
    Find(String),

    /// Download the report, optionally into a directory
    Report(Option<PathBuf>),

    /// Display help information
    Help,

    /// Exit the chat
    Exit,

    /// Not a special command, send the input to the assistant
    None,
}

/// Parse user input into a special command
///
/// # Arguments
///
/// * `input` - The user's input string
///
/// # Returns
///
/// Returns `Ok(SpecialCommand)` for recognized commands, `Ok(SpecialCommand::None)`
/// for regular chat input, or `Err(CommandError)` for malformed commands.
///
/// # Examples
///
/// ```
/// use tablechat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewSession);
/// assert_eq!(
///     parse_special_command("/load AB12CD34").unwrap(),
///     SpecialCommand::LoadSession("AB12CD34".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/bogus").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return match lower.as_str() {
            "exit" | "quit" => Ok(SpecialCommand::Exit),
            _ => Ok(SpecialCommand::None),
        };
    }

    let (command, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match command.as_str() {
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        "/help" | "/?" => Ok(SpecialCommand::Help),

        "/new" => Ok(SpecialCommand::NewSession),
        "/sessions" | "/list" => Ok(SpecialCommand::ListSessions),
        "/clear" => Ok(SpecialCommand::ClearSessions),

        "/load" | "/switch" => required(&command, arg, "/load <session id>")
            .map(|id| SpecialCommand::LoadSession(id.to_string())),
        "/delete" => required(&command, arg, "/delete <session id>")
            .map(|id| SpecialCommand::DeleteSession(id.to_string())),

        "/search" => match arg.to_lowercase().as_str() {
            "" => Ok(SpecialCommand::ShowSearch),
            "on" => Ok(SpecialCommand::SetSearch(true)),
            "off" => Ok(SpecialCommand::SetSearch(false)),
            _ => Err(CommandError::UnsupportedArgument {
                command: "/search".to_string(),
                arg: arg.to_string(),
            }),
        },

        "/find" => required(&command, arg, "/find <query>")
            .map(|query| SpecialCommand::Find(query.to_string())),

        "/report" => Ok(SpecialCommand::Report(
            (!arg.is_empty()).then(|| PathBuf::from(arg)),
        )),

        _ => Err(CommandError::UnknownCommand(command)),
    }
}

fn required<'a>(command: &str, arg: &'a str, usage: &str) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg)
    }
}

/// Help text for interactive chat
pub const HELP_TEXT: &str = r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /new              - Start a new session
  /sessions         - List saved sessions (* marks the active one)
  /load <id>        - Switch to a session (full id or the short id shown)
  /delete <id>      - Delete a session
  /clear            - Delete every session and start a fresh one

SEARCH AND REPORTS:
  /search on|off    - Ground replies in a web search
  /search           - Show whether search is on
  /find <query>     - Run a web search and show the results
  /report [dir]     - Generate and download the report document

OTHER:
  /help             - Show this help message
  exit, quit, /exit - Leave the chat

Anything else is sent to the assistant.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(
            parse_special_command("/new").unwrap(),
            SpecialCommand::NewSession
        );
        assert_eq!(
            parse_special_command("/SESSIONS").unwrap(),
            SpecialCommand::ListSessions
        );
        assert_eq!(
            parse_special_command("/clear").unwrap(),
            SpecialCommand::ClearSessions
        );
        assert_eq!(
            parse_special_command("/Load 01HZX9QK").unwrap(),
            SpecialCommand::LoadSession("01HZX9QK".to_string())
        );
        assert_eq!(
            parse_special_command("/delete session_01HZX9QKABCDEF").unwrap(),
            SpecialCommand::DeleteSession("session_01HZX9QKABCDEF".to_string())
        );
    }

    #[test]
    fn test_parse_missing_arguments() {
        assert_eq!(
            parse_special_command("/load").unwrap_err(),
            CommandError::MissingArgument {
                command: "/load".to_string(),
                usage: "/load <session id>".to_string(),
            }
        );
        assert!(matches!(
            parse_special_command("/delete   "),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse_special_command("/find"),
            Err(CommandError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_search_toggle() {
        assert_eq!(
            parse_special_command("/search on").unwrap(),
            SpecialCommand::SetSearch(true)
        );
        assert_eq!(
            parse_special_command("/search OFF").unwrap(),
            SpecialCommand::SetSearch(false)
        );
        assert_eq!(
            parse_special_command("/search").unwrap(),
            SpecialCommand::ShowSearch
        );
        assert_eq!(
            parse_special_command("/search maybe").unwrap_err(),
            CommandError::UnsupportedArgument {
                command: "/search".to_string(),
                arg: "maybe".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_find_keeps_query_case() {
        assert_eq!(
            parse_special_command("/find Best Pho in Hanoi").unwrap(),
            SpecialCommand::Find("Best Pho in Hanoi".to_string())
        );
    }

    #[test]
    fn test_parse_report() {
        assert_eq!(
            parse_special_command("/report").unwrap(),
            SpecialCommand::Report(None)
        );
        assert_eq!(
            parse_special_command("/report out/Reports").unwrap(),
            SpecialCommand::Report(Some(PathBuf::from("out/Reports")))
        );
    }

    #[test]
    fn test_parse_exit_variants() {
        for input in ["exit", "QUIT", "/exit", "/quit", "  exit  "] {
            assert_eq!(
                parse_special_command(input).unwrap(),
                SpecialCommand::Exit,
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_regular_input_is_not_a_command() {
        assert_eq!(
            parse_special_command("What is on the menu?").unwrap(),
            SpecialCommand::None
        );
        assert_eq!(
            parse_special_command("exit the kitchen through the back").unwrap(),
            SpecialCommand::None
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_special_command("/mode write").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/mode".to_string()));
        assert!(err.to_string().contains("/help"));
    }

    #[test]
    fn test_help_text_mentions_every_command() {
        for command in [
            "/new", "/sessions", "/load", "/delete", "/clear", "/search", "/find", "/report",
            "/help",
        ] {
            assert!(HELP_TEXT.contains(command), "missing {}", command);
        }
    }
}
