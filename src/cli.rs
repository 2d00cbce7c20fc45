//! Command-line interface definition for Tablechat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, managing saved sessions, web search,
//! and report download.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tablechat - terminal client for the restaurant assistant
///
/// Chat with the assistant server, keep several conversations, search the
/// web and download generated reports.
#[derive(Parser, Debug, Clone)]
#[command(name = "tablechat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory of the session database (overrides config and TABLECHAT_STORE_PATH)
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Tablechat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Ask the server to ground replies in a web search
        #[arg(short, long)]
        search: bool,

        /// Open this session (full or short id) instead of the last active one
        #[arg(long)]
        session: Option<String>,
    },

    /// Manage saved sessions
    Sessions {
        /// Session management subcommand
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Run a web search through the server
    Search {
        /// Search query
        query: String,

        /// Maximum number of results (defaults to chat.search_max_results)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate and download the report document
    Report {
        /// Directory to save the report into (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionsCommand {
    /// List saved sessions, most recent first
    List,

    /// Print the messages of a session
    Show {
        /// Session id (full or short)
        id: String,

        /// Render messages as HTML instead of terminal text
        #[arg(long)]
        html: bool,
    },

    /// Delete a session
    Delete {
        /// Session id (full or short)
        id: String,
    },

    /// Delete every session and start a fresh one
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
