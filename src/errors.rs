//! Error types for tokenpipe
//!
//! Attempt-level failures (transport, status, protocol) are absorbed by the
//! retrying generator; only configuration problems, metadata lookups and
//! exhausted retries surface to callers through this type.

use crate::types::StreamOutcome;
use thiserror::Error;

/// Main error type for the tokenpipe client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection refused, reset, DNS failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    /// Framing failure severe enough to abort a read loop
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Every attempt of a generation failed
    #[error("All {attempts} attempts failed, last failure: {last}")]
    RetriesExhausted { attempts: u32, last: StreamOutcome },

    /// Endpoint URL could not be parsed or has no host
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ClientError {
    /// Map a reqwest failure onto the attempt-level taxonomy.
    ///
    /// Body decode failures are framing problems; everything else
    /// (connect, timeout, reset, redirect loops) is transport.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Protocol(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Status { .. } | ClientError::Protocol(_)
        )
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
