//! Telemetry system for tokenpipe
//!
//! The collector is handed to every streaming component instead of a global
//! logger. It keeps a bounded event history and aggregate stats that callers
//! and tests can inspect, and forwards each event to `tracing`.

pub mod logging;

use crate::types::StreamOutcome;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Maximum number of events retained in history
pub const MAX_EVENTS: usize = 1024;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Attempt lifecycle
    AttemptStarted {
        attempt: u32,
        max_attempts: u32,
        timestamp: Instant,
    },
    StreamOpened {
        attempt: u32,
        timestamp: Instant,
    },
    EmptyContent {
        attempt: u32,
        timestamp: Instant,
    },
    StatusRejected {
        attempt: u32,
        code: u16,
        reason: String,
        timestamp: Instant,
    },
    AttemptFailed {
        attempt: u32,
        outcome: StreamOutcome,
        timestamp: Instant,
    },
    BackoffScheduled {
        attempt: u32,
        delay: Duration,
        timestamp: Instant,
    },

    // Stream content
    EventData {
        payload: String,
        timestamp: Instant,
    },
    TokenReceived {
        token: String,
        timestamp: Instant,
    },
    PayloadSkipped {
        payload: String,
        reason: String,
        timestamp: Instant,
    },
    UndecodableLine {
        length: usize,
        timestamp: Instant,
    },

    // Generation lifecycle
    GenerationCompleted {
        attempts: u32,
        tokens: usize,
        timestamp: Instant,
    },
    RetriesExhausted {
        attempts: u32,
        last: StreamOutcome,
        timestamp: Instant,
    },
}

impl TelemetryEvent {
    pub fn attempt_started(attempt: u32, max_attempts: u32) -> Self {
        Self::AttemptStarted {
            attempt,
            max_attempts,
            timestamp: Instant::now(),
        }
    }

    pub fn stream_opened(attempt: u32) -> Self {
        Self::StreamOpened {
            attempt,
            timestamp: Instant::now(),
        }
    }

    pub fn empty_content(attempt: u32) -> Self {
        Self::EmptyContent {
            attempt,
            timestamp: Instant::now(),
        }
    }

    pub fn status_rejected(attempt: u32, code: u16, reason: &str) -> Self {
        Self::StatusRejected {
            attempt,
            code,
            reason: reason.to_string(),
            timestamp: Instant::now(),
        }
    }

    pub fn attempt_failed(attempt: u32, outcome: StreamOutcome) -> Self {
        Self::AttemptFailed {
            attempt,
            outcome,
            timestamp: Instant::now(),
        }
    }

    pub fn backoff_scheduled(attempt: u32, delay: Duration) -> Self {
        Self::BackoffScheduled {
            attempt,
            delay,
            timestamp: Instant::now(),
        }
    }

    pub fn event_data(payload: &str) -> Self {
        Self::EventData {
            payload: payload.to_string(),
            timestamp: Instant::now(),
        }
    }

    pub fn token_received(token: &str) -> Self {
        Self::TokenReceived {
            token: token.to_string(),
            timestamp: Instant::now(),
        }
    }

    pub fn payload_skipped(payload: &str, reason: impl Into<String>) -> Self {
        Self::PayloadSkipped {
            payload: payload.to_string(),
            reason: reason.into(),
            timestamp: Instant::now(),
        }
    }

    pub fn undecodable_line(length: usize) -> Self {
        Self::UndecodableLine {
            length,
            timestamp: Instant::now(),
        }
    }

    pub fn generation_completed(attempts: u32, tokens: usize) -> Self {
        Self::GenerationCompleted {
            attempts,
            tokens,
            timestamp: Instant::now(),
        }
    }

    pub fn retries_exhausted(attempts: u32, last: StreamOutcome) -> Self {
        Self::RetriesExhausted {
            attempts,
            last,
            timestamp: Instant::now(),
        }
    }

    /// Forward to the process-wide `tracing` dispatcher, if any
    fn emit(&self) {
        match self {
            Self::AttemptStarted { attempt, max_attempts, .. } => {
                tracing::info!("Starting SSE request (attempt {}/{})", attempt, max_attempts);
            }
            Self::StreamOpened { attempt, .. } => {
                tracing::info!(attempt, "SSE request successful, streaming data");
            }
            Self::EmptyContent { attempt, .. } => {
                tracing::warn!(attempt, "Received empty content from server");
            }
            Self::StatusRejected { attempt, code, reason, .. } => {
                tracing::error!(attempt, "Failed to connect: {} - {}", code, reason);
            }
            Self::AttemptFailed { attempt, outcome, .. } => {
                tracing::error!(attempt, kind = outcome.kind(), "Request failed: {}", outcome);
            }
            Self::BackoffScheduled { delay, .. } => {
                tracing::info!("Retrying in {:.2} seconds", delay.as_secs_f64());
            }
            Self::EventData { payload, .. } => {
                tracing::debug!("Event data: {}", payload);
            }
            Self::TokenReceived { token, .. } => {
                tracing::trace!("Token received: {:?}", token);
            }
            Self::PayloadSkipped { payload, reason, .. } => {
                tracing::warn!(payload = %payload, "Error processing event: {}", reason);
            }
            Self::UndecodableLine { length, .. } => {
                tracing::warn!(length, "Skipping line that is not valid UTF-8");
            }
            Self::GenerationCompleted { attempts, tokens, .. } => {
                tracing::debug!(attempts, tokens, "Generation completed");
            }
            Self::RetriesExhausted { attempts, last, .. } => {
                tracing::error!(
                    attempts,
                    "All retries failed, aborting SSE request (last: {})",
                    last
                );
            }
        }
    }
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub tokens_received: usize,
    pub attempts_started: usize,
    pub attempts_failed: usize,
    pub retry_attempts: usize,
    pub payloads_skipped: usize,
    pub lines_skipped: usize,
    pub generations_completed: usize,
    pub generations_exhausted: usize,
}

/// Telemetry collector
///
/// Cloning is cheap and clones share the same history.
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        event.emit();

        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::AttemptStarted { .. } => stats.attempts_started += 1,
                TelemetryEvent::AttemptFailed { .. } => stats.attempts_failed += 1,
                TelemetryEvent::BackoffScheduled { .. } => stats.retry_attempts += 1,
                TelemetryEvent::TokenReceived { .. } => stats.tokens_received += 1,
                TelemetryEvent::PayloadSkipped { .. } => stats.payloads_skipped += 1,
                TelemetryEvent::UndecodableLine { .. } => stats.lines_skipped += 1,
                TelemetryEvent::GenerationCompleted { .. } => stats.generations_completed += 1,
                TelemetryEvent::RetriesExhausted { .. } => stats.generations_exhausted += 1,
                TelemetryEvent::StreamOpened { .. }
                | TelemetryEvent::EmptyContent { .. }
                | TelemetryEvent::StatusRejected { .. }
                | TelemetryEvent::EventData { .. } => {}
            }
        }

        let mut events = lock(&self.events);
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Snapshot of the retained history
    pub fn events(&self) -> Vec<TelemetryEvent> {
        lock(&self.events).iter().cloned().collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

// A panic while holding the lock leaves plain counters behind, still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    /// Create a new display
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("\n📊 Session Summary");
        println!("─────────────────────────────────────");
        println!("Duration:          {:?}", elapsed);
        println!("Tokens received:   {}", stats.tokens_received);
        println!("Attempts:          {}", stats.attempts_started);
        println!("Retries:           {}", stats.retry_attempts);
        println!("Skipped payloads:  {}", stats.payloads_skipped);
        println!("Exhausted:         {}", stats.generations_exhausted);
        println!();
    }

    /// Check if should show the session summary
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}
