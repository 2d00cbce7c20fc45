//! Error types for Tablechat
//!
//! This module defines the error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Tablechat operations
///
/// Covers configuration loading, session persistence, and the HTTP
/// interactions with the chat, search, and report endpoints.
#[derive(Error, Debug)]
pub enum TablechatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage errors (key-value backend operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transport errors before or during a streamed response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("Server returned HTTP {status}")]
    HttpStatus {
        /// The HTTP status code returned by the server
        status: u16,
    },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Tablechat operations
///
/// Uses `anyhow::Error` so callers can attach context while the
/// typed `TablechatError` stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
