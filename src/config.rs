//! Configuration management for Tablechat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, TablechatError};
use crate::format::MarkupFormat;
use crate::session::SessionTexts;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Tablechat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat server endpoints
    #[serde(default)]
    pub server: ServerConfig,
    /// Interactive chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Session persistence
    #[serde(default)]
    pub storage: StorageConfig,
    /// User-facing texts
    #[serde(default)]
    pub texts: TextsConfig,
}

/// Chat server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the chat server, without a trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the streaming chat endpoint
    #[serde(default = "default_chat_path")]
    pub chat_path: String,

    /// Path of the web search endpoint
    #[serde(default = "default_search_path")]
    pub search_path: String,

    /// Path of the report generation endpoint
    #[serde(default = "default_report_path")]
    pub report_path: String,

    /// Connect timeout for all requests
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chat_path() -> String {
    "/chat".to_string()
}

fn default_search_path() -> String {
    "/search".to_string()
}

fn default_report_path() -> String {
    "/generate-ppt".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            search_path: default_search_path(),
            report_path: default_report_path(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Ask the server to ground replies in a web search
    #[serde(default)]
    pub use_search: bool,

    /// Result count requested by `/find` and `tablechat search`
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    /// Markup used when rendering messages
    #[serde(default)]
    pub format: MarkupFormat,
}

fn default_search_max_results() -> usize {
    5
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            use_search: false,
            search_max_results: default_search_max_results(),
            format: MarkupFormat::default(),
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the session database; the platform data dir when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// User-facing texts, overridable for localization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextsConfig {
    /// Welcome message every session starts with
    #[serde(default = "default_welcome")]
    pub welcome: String,

    /// Shown in place of a reply when the chat request fails
    #[serde(default = "default_fallback_error")]
    pub fallback_error: String,

    /// Name given to new sessions
    #[serde(default = "default_session_name")]
    pub default_session_name: String,

    /// Preview shown before the first user message
    #[serde(default = "default_preview")]
    pub default_preview: String,
}

fn default_welcome() -> String {
    SessionTexts::default().welcome
}

fn default_fallback_error() -> String {
    "Sorry, something went wrong. Please try again.".to_string()
}

fn default_session_name() -> String {
    SessionTexts::default().default_name
}

fn default_preview() -> String {
    SessionTexts::default().default_preview
}

impl Default for TextsConfig {
    fn default() -> Self {
        Self {
            welcome: default_welcome(),
            fallback_error: default_fallback_error(),
            default_session_name: default_session_name(),
            default_preview: default_preview(),
        }
    }
}

impl TextsConfig {
    /// Texts the session store synthesizes
    pub fn session_texts(&self) -> SessionTexts {
        SessionTexts {
            welcome: self.welcome.clone(),
            default_name: self.default_session_name.clone(),
            default_preview: self.default_preview.clone(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TablechatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| TablechatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("TABLECHAT_BASE_URL") {
            self.server.base_url = base_url;
        }

        if let Ok(use_search) = std::env::var("TABLECHAT_USE_SEARCH") {
            match use_search.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.chat.use_search = true,
                "0" | "false" | "no" | "off" => self.chat.use_search = false,
                _ => tracing::warn!("Invalid TABLECHAT_USE_SEARCH: {}", use_search),
            }
        }

        if let Ok(max_results) = std::env::var("TABLECHAT_SEARCH_MAX_RESULTS") {
            if let Ok(value) = max_results.parse() {
                self.chat.search_max_results = value;
            } else {
                tracing::warn!("Invalid TABLECHAT_SEARCH_MAX_RESULTS: {}", max_results);
            }
        }

        if let Ok(path) = std::env::var("TABLECHAT_STORE_PATH") {
            self.storage.path = Some(path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.storage_path {
            tracing::info!("Using storage path override from CLI: {}", path);
            self.storage.path = Some(path.clone());
        }
    }

    /// Directory of the session database
    ///
    /// # Errors
    ///
    /// Returns error if no path is configured and the platform data
    /// directory cannot be determined
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => crate::storage::default_store_path(),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.server.base_url).map_err(|e| {
            TablechatError::Config(format!(
                "Invalid server.base_url '{}': {}",
                self.server.base_url, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(TablechatError::Config(format!(
                "server.base_url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        for (name, path) in [
            ("server.chat_path", &self.server.chat_path),
            ("server.search_path", &self.server.search_path),
            ("server.report_path", &self.server.report_path),
        ] {
            if !path.starts_with('/') {
                return Err(
                    TablechatError::Config(format!("{} must start with '/': {}", name, path))
                        .into(),
                );
            }
        }

        if self.server.connect_timeout_seconds == 0 {
            return Err(TablechatError::Config(
                "server.connect_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.search_max_results == 0 {
            return Err(TablechatError::Config(
                "chat.search_max_results must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
