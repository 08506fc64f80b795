//! Retrying generator
//!
//! Runs stream sessions one after another under a `RetryPolicy` and hands the
//! caller a single token sequence for the whole logical request.
//!
//! A retry starts the request over. Tokens a failed attempt already produced
//! stay delivered, so a caller concatenating tokens may see the transcript
//! restart mid-sentence; `GenerationReport::attempts` exposes where each
//! attempt began.

use crate::errors::{ClientError, Result};
use crate::generation::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::streaming::{SessionEvent, StreamSession, Transport};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::{GenerationRequest, StreamOutcome};
use futures_util::Stream;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Where a generation stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    InProgress,
    Completed,
    Exhausted { attempts: u32, last: StreamOutcome },
}

/// Tokens and outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub tokens: usize,
    pub outcome: Option<StreamOutcome>,
}

/// Per-attempt breakdown of a generation
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub id: Uuid,
    pub attempts: Vec<AttemptRecord>,
    pub status: GenerationStatus,
}

impl GenerationReport {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            attempts: Vec::new(),
            status: GenerationStatus::InProgress,
        }
    }

    /// Tokens delivered across all attempts
    pub fn total_tokens(&self) -> usize {
        self.attempts.iter().map(|a| a.tokens).sum()
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Completed
    }

    /// True when a failed attempt delivered tokens and a later attempt
    /// started over, i.e. the concatenated output is not one transcript.
    pub fn is_discontinuous(&self) -> bool {
        let last = self.attempts.len().saturating_sub(1);
        self.attempts[..last].iter().any(|a| a.tokens > 0)
    }

    /// Turn exhausted retries into an error
    pub fn into_result(self) -> Result<Self> {
        match &self.status {
            GenerationStatus::Exhausted { attempts, last } => Err(ClientError::RetriesExhausted {
                attempts: *attempts,
                last: last.clone(),
            }),
            _ => Ok(self),
        }
    }
}

/// Entry point for retried streaming generations
#[derive(Clone)]
pub struct RetryingGenerator {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    telemetry: TelemetryCollector,
}

impl RetryingGenerator {
    /// Create generator sleeping on the tokio timer
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(TokioSleeper),
            telemetry: TelemetryCollector::new(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Start a generation. Nothing is sent until the first `next()`.
    pub fn generate(&self, request: GenerationRequest, policy: RetryPolicy) -> TokenStream {
        TokenStream {
            transport: Arc::clone(&self.transport),
            sleeper: Arc::clone(&self.sleeper),
            telemetry: self.telemetry.clone(),
            request,
            policy,
            session: None,
            backoff: None,
            report: GenerationReport::new(),
        }
    }
}

/// Lazy, non-restartable token sequence of one generation.
///
/// Dropping it closes any open connection and abandons any pending backoff.
pub struct TokenStream {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    telemetry: TelemetryCollector,
    request: GenerationRequest,
    policy: RetryPolicy,
    session: Option<StreamSession>,
    backoff: Option<Duration>,
    report: GenerationReport,
}

impl TokenStream {
    /// Next token, or `None` once the generation completed or ran out of
    /// attempts. Check `report()` to tell the two apart.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            if self.report.status != GenerationStatus::InProgress {
                return None;
            }

            if let Some(delay) = self.backoff {
                self.sleeper.sleep(delay).await;
                self.backoff = None;
            }

            if self.session.is_none() {
                let session = self.start_attempt().await;
                self.session = Some(session);
            }

            let event = match self.session.as_mut() {
                Some(session) => session.next_event().await,
                None => continue,
            };

            match event {
                SessionEvent::Token(token) => {
                    if let Some(record) = self.report.attempts.last_mut() {
                        record.tokens += 1;
                    }
                    return Some(token);
                }
                SessionEvent::Finished(outcome) => {
                    // Release the connection before any retry opens a new one
                    self.session = None;
                    self.finish_attempt(outcome);
                }
            }
        }
    }

    /// Per-attempt breakdown so far
    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    pub fn status(&self) -> &GenerationStatus {
        &self.report.status
    }

    pub fn into_report(self) -> GenerationReport {
        self.report
    }

    /// Drain every token, then return them with the final report
    pub async fn collect_all(mut self) -> (Vec<String>, GenerationReport) {
        let mut tokens = Vec::new();
        while let Some(token) = self.next().await {
            tokens.push(token);
        }
        (tokens, self.report)
    }

    /// Adapt into a `futures` stream; the report is not available afterwards
    pub fn into_stream(self) -> impl Stream<Item = String> + Send {
        futures_util::stream::unfold(self, |mut tokens| async move {
            tokens.next().await.map(|token| (token, tokens))
        })
    }

    async fn start_attempt(&mut self) -> StreamSession {
        let attempt = self.report.attempts.len() as u32 + 1;
        self.telemetry.record(TelemetryEvent::attempt_started(
            attempt,
            self.policy.max_attempts(),
        ));
        let session = StreamSession::start(
            self.transport.as_ref(),
            &self.request,
            attempt,
            self.telemetry.clone(),
        )
        .await;

        // Recorded only once the open finished, so an abandoned open is not counted
        self.report.attempts.push(AttemptRecord {
            attempt,
            tokens: 0,
            outcome: None,
        });
        session
    }

    fn finish_attempt(&mut self, outcome: StreamOutcome) {
        let attempt = self.report.attempts.len() as u32;
        if let Some(record) = self.report.attempts.last_mut() {
            record.outcome = Some(outcome.clone());
        }

        if outcome.is_success() {
            self.telemetry.record(TelemetryEvent::generation_completed(
                attempt,
                self.report.total_tokens(),
            ));
            self.report.status = GenerationStatus::Completed;
            return;
        }

        self.telemetry
            .record(TelemetryEvent::attempt_failed(attempt, outcome.clone()));

        if attempt >= self.policy.max_attempts() {
            self.telemetry
                .record(TelemetryEvent::retries_exhausted(attempt, outcome.clone()));
            self.report.status = GenerationStatus::Exhausted {
                attempts: attempt,
                last: outcome,
            };
            return;
        }

        let delay = self.policy.delay_for(attempt);
        self.telemetry
            .record(TelemetryEvent::backoff_scheduled(attempt, delay));
        self.backoff = Some(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::fake::{
        token_line, BodyStep, FakeTransport, RecordingSleeper, Script, StalledSleeper,
    };
    use futures_util::StreamExt;

    fn setup(
        transport: FakeTransport,
    ) -> (Arc<FakeTransport>, Arc<RecordingSleeper>, RetryingGenerator) {
        let transport = Arc::new(transport);
        let sleeper = Arc::new(RecordingSleeper::default());
        let generator = RetryingGenerator::new(transport.clone()).with_sleeper(sleeper.clone());
        (transport, sleeper, generator)
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(100),
            Duration::from_millis(150),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let (transport, sleeper, generator) =
            setup(FakeTransport::new().then_tokens(&["He", "llo"]));

        let (tokens, report) = generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .collect_all()
            .await;

        assert_eq!(tokens, vec!["He", "llo"]);
        assert!(report.is_success());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(transport.opened(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_retries_exhausted_with_backoff() {
        let (transport, sleeper, generator) = setup(
            FakeTransport::new()
                .then_status(503)
                .then_status(503)
                .then_status(503),
        );

        let (tokens, report) = generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .collect_all()
            .await;

        assert!(tokens.is_empty());
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(100), Duration::from_millis(150)]
        );
        assert_eq!(
            report.status,
            GenerationStatus::Exhausted {
                attempts: 3,
                last: StreamOutcome::FailedWithStatus(503),
            }
        );
        assert!(matches!(
            report.into_result(),
            Err(ClientError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_success_short_circuits_retry() {
        let (transport, sleeper, generator) = setup(
            FakeTransport::new()
                .then_refuse()
                .then_tokens(&["ok"])
                .then_tokens(&["unused"]),
        );

        let (tokens, report) = generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .collect_all()
            .await;

        assert_eq!(tokens, vec!["ok"]);
        assert!(report.is_success());
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(100)]);
    }

    #[tokio::test]
    async fn test_partial_then_fail_concatenates() {
        let (_transport, _sleeper, generator) = setup(
            FakeTransport::new()
                .then_tokens_then_reset(&["The", "cat"])
                .then_tokens(&["A", "dog", "sat"]),
        );

        let (tokens, report) = generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .collect_all()
            .await;

        assert_eq!(tokens, vec!["The", "cat", "A", "dog", "sat"]);
        assert!(report.is_success());
        assert!(report.is_discontinuous());
        assert_eq!(report.attempts[0].tokens, 2);
        assert!(matches!(
            report.attempts[0].outcome,
            Some(StreamOutcome::FailedWithTransportError(_))
        ));
        assert_eq!(report.attempts[1].tokens, 3);
        assert_eq!(report.attempts[1].outcome, Some(StreamOutcome::CompletedNormally));
    }

    #[tokio::test]
    async fn test_empty_content_stops_without_retry() {
        let (transport, sleeper, generator) =
            setup(FakeTransport::new().then_empty().then_tokens(&["unused"]));

        let (tokens, report) = generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .collect_all()
            .await;

        assert!(tokens.is_empty());
        assert!(report.is_success());
        assert_eq!(transport.requests().len(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_single_attempt_policy_never_sleeps() {
        let (transport, sleeper, generator) =
            setup(FakeTransport::new().then_refuse().then_tokens(&["unused"]));

        let mut stream = generator.generate(GenerationRequest::new("hi"), RetryPolicy::no_retry());
        assert_eq!(stream.next().await, None);
        assert!(matches!(stream.status(), GenerationStatus::Exhausted { attempts: 1, .. }));
        assert_eq!(transport.requests().len(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_closes_connection() {
        let (transport, sleeper, generator) = setup(
            FakeTransport::new()
                .then_tokens(&["a", "b", "c"])
                .then_tokens(&["unused"]),
        );

        let mut stream = generator.generate(GenerationRequest::new("hi"), policy(3));
        assert_eq!(stream.next().await.as_deref(), Some("a"));
        assert_eq!(transport.closed(), 0);

        drop(stream);

        assert_eq!(transport.closed(), 1);
        assert_eq!(transport.requests().len(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_bytes() {
        let (transport, _sleeper, generator) = setup(FakeTransport::new().then_steps(vec![
            BodyStep::Chunk(token_line("a").into_bytes()),
            BodyStep::Pending,
        ]));
        let mut tokens = generator.generate(GenerationRequest::new("hi"), policy(3));

        assert_eq!(tokens.next().await.as_deref(), Some("a"));
        let stuck = tokio::time::timeout(Duration::from_millis(50), tokens.next()).await;
        assert!(stuck.is_err());
        assert_eq!(transport.closed(), 0);

        drop(tokens);
        assert_eq!(transport.opened(), 1);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_opens_nothing_more() {
        let transport = Arc::new(FakeTransport::new().then_status(500).then_tokens(&["x"]));
        let generator =
            RetryingGenerator::new(transport.clone()).with_sleeper(Arc::new(StalledSleeper));
        let mut tokens = generator.generate(GenerationRequest::new("hi"), policy(3));

        let stuck = tokio::time::timeout(Duration::from_millis(50), tokens.next()).await;
        assert!(stuck.is_err());
        assert_eq!(tokens.report().attempts.len(), 1);

        drop(tokens);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_open_does_not_use_an_attempt() {
        let (transport, _sleeper, generator) =
            setup(FakeTransport::new().then(Script::Hang).then_tokens(&["a"]));
        let mut tokens = generator.generate(GenerationRequest::new("hi"), policy(1));

        let stuck = tokio::time::timeout(Duration::from_millis(50), tokens.next()).await;
        assert!(stuck.is_err());
        assert!(tokens.report().attempts.is_empty());

        assert_eq!(tokens.next().await.as_deref(), Some("a"));
        assert_eq!(tokens.next().await, None);

        let report = tokens.into_report();
        assert!(report.is_success());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].attempt, 1);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_lazy_until_polled() {
        let (transport, _sleeper, generator) = setup(FakeTransport::new().then_tokens(&["a"]));
        let stream = generator.generate(GenerationRequest::new("hi"), policy(3));
        assert!(transport.requests().is_empty());
        assert_eq!(stream.status(), &GenerationStatus::InProgress);
    }

    #[tokio::test]
    async fn test_exhausted_stream_stays_finished() {
        let (transport, _sleeper, generator) =
            setup(FakeTransport::new().then_status(500).then_tokens(&["late"]));

        let mut stream = generator.generate(GenerationRequest::new("hi"), RetryPolicy::no_retry());
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_same_request_every_attempt() {
        let (transport, _sleeper, generator) =
            setup(FakeTransport::new().then_status(502).then_tokens(&["x"]));
        let request = GenerationRequest::with_sampling("same", 0.3, 0.8).unwrap();

        generator.generate(request.clone(), policy(2)).collect_all().await;

        assert_eq!(transport.requests(), vec![request.clone(), request]);
    }

    #[tokio::test]
    async fn test_telemetry_records_lifecycle() {
        let telemetry = TelemetryCollector::new();
        let (_transport, _sleeper, generator) =
            setup(FakeTransport::new().then_status(500).then_tokens(&["x"]));
        let generator = generator.with_telemetry(telemetry.clone());

        generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .collect_all()
            .await;

        let stats = telemetry.get_stats();
        assert_eq!(stats.attempts_started, 2);
        assert_eq!(stats.attempts_failed, 1);
        assert_eq!(stats.retry_attempts, 1);
        assert_eq!(stats.tokens_received, 1);
        assert_eq!(stats.generations_completed, 1);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let (_transport, _sleeper, generator) = setup(
            FakeTransport::new()
                .then_tokens_then_reset(&["The", "cat"])
                .then_tokens(&["A", "dog", "sat"]),
        );

        let tokens: Vec<String> = generator
            .generate(GenerationRequest::new("hi"), policy(3))
            .into_stream()
            .collect()
            .await;

        assert_eq!(tokens, vec!["The", "cat", "A", "dog", "sat"]);
    }

    #[test]
    fn test_report_without_attempts() {
        let report = GenerationReport::new();
        assert_eq!(report.total_tokens(), 0);
        assert!(!report.is_discontinuous());
        assert!(report.into_result().is_ok());
    }
}
