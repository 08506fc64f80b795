//! Token event payload parsing
//!
//! A bad payload costs one token, never the stream.

use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use serde::Deserialize;

/// Structured form of an event payload.
///
/// Only `token` is read; any other fields the service sends are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TokenEvent {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenEvent {
    /// Decode a payload, surfacing the JSON error
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Non-empty token text, if any
    pub fn into_token(self) -> Option<String> {
        self.token.filter(|t| !t.is_empty())
    }
}

/// Turns event payloads into tokens, reporting skips to telemetry
#[derive(Clone, Default)]
pub struct TokenEventParser {
    telemetry: TelemetryCollector,
}

impl TokenEventParser {
    pub fn new(telemetry: TelemetryCollector) -> Self {
        Self { telemetry }
    }

    /// Extract the token from one payload.
    ///
    /// Malformed JSON is recorded as a skipped payload and yields `None`.
    /// A missing or empty token also yields `None` but is not a failure.
    pub fn parse(&self, payload: &str) -> Option<String> {
        self.telemetry.record(TelemetryEvent::event_data(payload));

        match TokenEvent::decode(payload) {
            Ok(event) => event.into_token(),
            Err(e) => {
                self.telemetry
                    .record(TelemetryEvent::payload_skipped(payload, e.to_string()));
                None
            }
        }
    }
}
