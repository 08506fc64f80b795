//! Terminal state of a single streaming attempt

use crate::errors::ClientError;
use std::fmt;

/// How one request/response exchange ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Body exhausted (or explicitly empty) after a 2xx status
    CompletedNormally,

    /// Response carried a status outside 200..=299
    FailedWithStatus(u16),

    /// Connect failure, timeout, reset or similar
    FailedWithTransportError(String),

    /// Framing failure that aborted the read loop
    FailedWithProtocolError(String),
}

impl StreamOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StreamOutcome::CompletedNormally)
    }

    /// Short label for the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            StreamOutcome::CompletedNormally => "completed",
            StreamOutcome::FailedWithStatus(_) => "status",
            StreamOutcome::FailedWithTransportError(_) => "transport",
            StreamOutcome::FailedWithProtocolError(_) => "protocol",
        }
    }
}

impl From<ClientError> for StreamOutcome {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status { code, .. } => StreamOutcome::FailedWithStatus(code),
            ClientError::Protocol(cause) => StreamOutcome::FailedWithProtocolError(cause),
            ClientError::HttpError(e) => StreamOutcome::from(ClientError::from_reqwest(e)),
            ClientError::SerializationError(e) => {
                StreamOutcome::FailedWithProtocolError(e.to_string())
            }
            other => StreamOutcome::FailedWithTransportError(other.to_string()),
        }
    }
}

impl fmt::Display for StreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOutcome::CompletedNormally => write!(f, "completed normally"),
            StreamOutcome::FailedWithStatus(code) => write!(f, "HTTP status {}", code),
            StreamOutcome::FailedWithTransportError(cause) => {
                write!(f, "transport error: {}", cause)
            }
            StreamOutcome::FailedWithProtocolError(cause) => {
                write!(f, "protocol error: {}", cause)
            }
        }
    }
}
