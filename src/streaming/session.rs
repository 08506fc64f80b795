//! One request/response exchange
//!
//! A session owns the response body and its line buffer. Tokens are handed
//! out as soon as they are parsed; the next chunk is only read once every
//! token from the previous one has been taken. The body is dropped the
//! moment the session reaches its outcome, which closes the connection.

use crate::streaming::client::{ByteStream, Transport};
use crate::streaming::decoder::{extract_event, EventLineDecoder, RawLine};
use crate::streaming::event::TokenEventParser;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::{GenerationRequest, StreamOutcome};
use std::collections::VecDeque;

/// Next item produced by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Token(String),
    Finished(StreamOutcome),
}

enum SessionState {
    Streaming(Box<dyn ByteStream>),
    Finished(StreamOutcome),
}

/// Single streaming attempt
pub struct StreamSession {
    attempt: u32,
    state: SessionState,
    decoder: EventLineDecoder,
    parser: TokenEventParser,
    ready: VecDeque<String>,
    telemetry: TelemetryCollector,
}

impl StreamSession {
    /// Send the request and inspect the status line.
    ///
    /// Connection failures, non-2xx statuses and announced-empty bodies end
    /// the session immediately, before any body byte is read.
    pub async fn start(
        transport: &dyn Transport,
        request: &GenerationRequest,
        attempt: u32,
        telemetry: TelemetryCollector,
    ) -> Self {
        let state = match transport.open(request).await {
            Err(e) => SessionState::Finished(StreamOutcome::from(e)),
            Ok(response) if !response.is_success() => {
                telemetry.record(TelemetryEvent::status_rejected(
                    attempt,
                    response.status,
                    &response.reason,
                ));
                SessionState::Finished(StreamOutcome::FailedWithStatus(response.status))
            }
            Ok(response) if response.has_empty_content() => {
                telemetry.record(TelemetryEvent::empty_content(attempt));
                SessionState::Finished(StreamOutcome::CompletedNormally)
            }
            Ok(response) => {
                telemetry.record(TelemetryEvent::stream_opened(attempt));
                SessionState::Streaming(response.body)
            }
        };

        Self {
            attempt,
            state,
            decoder: EventLineDecoder::new(),
            parser: TokenEventParser::new(telemetry.clone()),
            ready: VecDeque::new(),
            telemetry,
        }
    }

    /// Wait for the next token or the terminal outcome.
    ///
    /// Once finished, every further call returns the same outcome.
    pub async fn next_event(&mut self) -> SessionEvent {
        loop {
            if let Some(token) = self.ready.pop_front() {
                self.telemetry.record(TelemetryEvent::token_received(&token));
                return SessionEvent::Token(token);
            }

            let body = match &mut self.state {
                SessionState::Finished(outcome) => return SessionEvent::Finished(outcome.clone()),
                SessionState::Streaming(body) => body,
            };

            let next = body.next_chunk().await;
            match next {
                Some(Ok(chunk)) => {
                    let decoded = self.decoder.feed(&chunk);
                    // Tokens from lines completed before an overflow still go out
                    self.accept(decoded.lines);
                    if let Some(e) = decoded.overflow {
                        self.close(StreamOutcome::from(e));
                    }
                }
                Some(Err(e)) => self.close(StreamOutcome::from(e)),
                None => {
                    let tail = self.decoder.finish();
                    self.accept(tail);
                    self.close(StreamOutcome::CompletedNormally);
                }
            }
        }
    }

    /// Convenience wrapper over `next_event` for callers that only want
    /// tokens; check `outcome()` afterwards.
    pub async fn next_token(&mut self) -> Option<String> {
        match self.next_event().await {
            SessionEvent::Token(token) => Some(token),
            SessionEvent::Finished(_) => None,
        }
    }

    /// Terminal outcome, once reached
    pub fn outcome(&self) -> Option<&StreamOutcome> {
        match &self.state {
            SessionState::Finished(outcome) => Some(outcome),
            SessionState::Streaming(_) => None,
        }
    }

    /// Attempt number this session belongs to (1-indexed)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    fn accept(&mut self, lines: impl IntoIterator<Item = RawLine>) {
        for line in lines {
            let text = match line.as_str() {
                Ok(text) => text,
                Err(_) => {
                    self.telemetry
                        .record(TelemetryEvent::undecodable_line(line.len()));
                    continue;
                }
            };

            if let Some(payload) = extract_event(text) {
                if let Some(token) = self.parser.parse(payload) {
                    self.ready.push_back(token);
                }
            }
        }
    }

    fn close(&mut self, outcome: StreamOutcome) {
        // Replacing the state drops the body and with it the connection
        self.state = SessionState::Finished(outcome);
    }
}
