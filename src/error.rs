use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("rate limited by proxy ({status})")]
    RateLimited { status: u16 },

    #[error("auth failed: {message}")]
    AuthFailed { message: String },

    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request task panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    /// HTTP status behind the error, if the proxy answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { status } => Some(*status),
            Self::Upstream { status, .. } => *status,
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Display message cut to at most `max_chars` characters.
    pub fn short_message(&self, max_chars: usize) -> String {
        truncate_chars(&self.to_string(), max_chars)
    }
}

/// Truncate on a char boundary. Never splits a multi-byte character.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}
