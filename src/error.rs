//! Error types for EchoDownloader

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Shown when a failure carries no usable message
pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// Malformed user input, detected before anything is recorded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no URL given")]
    Empty,

    #[error("not a recognised video URL: {0}")]
    UnsupportedUrl(String),
}

/// The preparation endpoint failed or answered with something unusable
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status, with the server's message when it sent one
    #[error("server returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request task ended without reporting an outcome
    #[error("{}", UNKNOWN_ERROR)]
    Interrupted,
}

impl ServiceError {
    /// Message attached to the errored record
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("invalid yaml at {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },

    #[error("validation error: {0}")]
    Validation(String),
}
